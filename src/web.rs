mod auth_routes;
pub mod common;
mod company_routes;
mod health_routes;
mod me_routes;
mod project_routes;
mod tag_routes;
mod team_routes;
mod validation;
mod video_routes;

pub use auth_routes::router as auth_routes;
pub use company_routes::router as company_routes;
pub use health_routes::router_with_state as health_routes;
pub use me_routes::router as me_routes;
pub use project_routes::router as project_routes;
pub use tag_routes::router as tag_routes;
pub use team_routes::router as team_routes;
pub use video_routes::router as video_routes;
