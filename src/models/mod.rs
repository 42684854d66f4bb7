pub mod companies;
pub mod company_members;
pub mod projects;
mod schema;
pub mod tags;
pub mod users;
pub mod videos;
