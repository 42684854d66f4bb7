use crate::models::companies::Company;
use crate::models::company_members::{CompanyMember, CompanyRole, MemberStatus};
use crate::models::projects::Project;
use crate::models::users::User;
use crate::models::videos::Video;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Read,
    Update,
    Delete,
    InviteMember,
    RemoveMember,
}

pub enum Target<'a> {
    Company {
        company: &'a Company,
        membership: Option<&'a CompanyMember>,
    },
    Project(&'a Project),
    Video(&'a Video),
}

/// Single decision point for resource authorization. Callers pass rows loaded
/// in the same request; nothing here reads the database or caches a verdict.
pub fn can_perform(user: &User, target: &Target<'_>, action: Action) -> bool {
    match target {
        Target::Company {
            company,
            membership,
        } => company_allows(user, company, *membership, action),
        Target::Project(project) => project_allows(user, project, action),
        Target::Video(video) => video_allows(user, video, action),
    }
}

fn company_allows(
    user: &User,
    company: &Company,
    membership: Option<&CompanyMember>,
    action: Action,
) -> bool {
    if company.owner_id == user.uuid {
        return true;
    }

    let Some(member) = membership else {
        return false;
    };

    match action {
        // A pending member can still see the company they were invited to
        Action::Read => true,
        _ if member.status() != MemberStatus::Active => false,
        Action::Update | Action::InviteMember => {
            matches!(member.role(), CompanyRole::Owner | CompanyRole::Admin)
        }
        Action::RemoveMember => matches!(
            member.role(),
            CompanyRole::Owner | CompanyRole::Admin | CompanyRole::Manager
        ),
        Action::Delete => matches!(member.role(), CompanyRole::Owner),
    }
}

fn project_allows(user: &User, project: &Project, action: Action) -> bool {
    if project.owner_id == user.uuid {
        return true;
    }

    match action {
        Action::Read | Action::Update => {
            shares_company(user.company_id, project.company_id) || on_team(user, project)
        }
        _ => false,
    }
}

fn video_allows(user: &User, video: &Video, action: Action) -> bool {
    if video.uploaded_by == user.uuid {
        return true;
    }

    match action {
        Action::Read => video.is_public || shares_company(user.company_id, video.company_id),
        Action::Update | Action::Delete => shares_company(user.company_id, video.company_id),
        _ => false,
    }
}

fn shares_company(user_company: Option<i32>, resource_company: Option<i32>) -> bool {
    matches!((user_company, resource_company), (Some(a), Some(b)) if a == b)
}

fn on_team(user: &User, project: &Project) -> bool {
    project
        .team()
        .map(|team| team.contains(&user.uuid))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_user(user_uuid: Uuid, company_id: Option<i32>) -> User {
        let now = Utc::now();
        User {
            id: 1,
            uuid: user_uuid,
            email: "user@example.com".to_string(),
            name: Some("Test User".to_string()),
            password_hash: "hash".to_string(),
            role: "member".to_string(),
            company_id,
            pending_company_id: None,
            invite_token_hash: None,
            invite_expires_at: None,
            reset_token_hash: None,
            reset_expires_at: None,
            needs_password_reset: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_company(owner_uuid: Uuid) -> Company {
        let now = Utc::now();
        Company {
            id: 10,
            uuid: Uuid::new_v4(),
            name: "Acme Studios".to_string(),
            description: None,
            website: None,
            industry: None,
            size: None,
            founded: None,
            location: None,
            logo_url: None,
            owner_id: owner_uuid,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_member(
        company_id: i32,
        user_uuid: Uuid,
        role: CompanyRole,
        status: MemberStatus,
    ) -> CompanyMember {
        let now = Utc::now();
        CompanyMember {
            id: 1,
            company_id,
            user_id: user_uuid,
            role: role.as_str().to_string(),
            status: status.as_str().to_string(),
            joined_at: None,
            invited_by: None,
            invite_token_hash: None,
            invite_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_project(owner_uuid: Uuid, company_id: Option<i32>) -> Project {
        let now = Utc::now();
        Project {
            id: 1,
            uuid: Uuid::new_v4(),
            name: "Launch Video".to_string(),
            description: None,
            status: "active".to_string(),
            progress: 0,
            owner_id: owner_uuid,
            company_id,
            team: serde_json::json!([]),
            tasks: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    fn test_video(uploader_uuid: Uuid, company_id: Option<i32>, is_public: bool) -> Video {
        let now = Utc::now();
        Video {
            id: 1,
            uuid: Uuid::new_v4(),
            title: "Cut 1".to_string(),
            storage_key: None,
            url: None,
            duration_secs: None,
            size_bytes: None,
            status: "ready".to_string(),
            project_id: None,
            uploaded_by: uploader_uuid,
            company_id,
            is_public,
            tags: serde_json::json!([]),
            clips: serde_json::json!([]),
            thumbnails: serde_json::json!([]),
            shorts: serde_json::json!([]),
            versions: serde_json::json!([]),
            comments: serde_json::json!([]),
            resources: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn company_role_matrix() {
        let owner_uuid = Uuid::new_v4();
        let company = test_company(owner_uuid);

        let cases = vec![
            (CompanyRole::Owner, Action::Update, true),
            (CompanyRole::Owner, Action::Delete, true),
            (CompanyRole::Owner, Action::InviteMember, true),
            (CompanyRole::Owner, Action::RemoveMember, true),
            (CompanyRole::Admin, Action::Update, true),
            (CompanyRole::Admin, Action::Delete, false),
            (CompanyRole::Admin, Action::InviteMember, true),
            (CompanyRole::Admin, Action::RemoveMember, true),
            (CompanyRole::Manager, Action::Update, false),
            (CompanyRole::Manager, Action::Delete, false),
            (CompanyRole::Manager, Action::InviteMember, false),
            (CompanyRole::Manager, Action::RemoveMember, true),
            (CompanyRole::Member, Action::Update, false),
            (CompanyRole::Member, Action::Delete, false),
            (CompanyRole::Member, Action::InviteMember, false),
            (CompanyRole::Member, Action::RemoveMember, false),
        ];

        for (role, action, expected) in cases {
            let user = test_user(Uuid::new_v4(), Some(company.id));
            let member = test_member(company.id, user.uuid, role.clone(), MemberStatus::Active);
            let target = Target::Company {
                company: &company,
                membership: Some(&member),
            };
            assert_eq!(
                can_perform(&user, &target, action),
                expected,
                "role {:?} action {:?}",
                role,
                action
            );
        }
    }

    #[test]
    fn every_member_status_can_read_the_company() {
        let company = test_company(Uuid::new_v4());

        for status in [MemberStatus::Active, MemberStatus::Pending] {
            let user = test_user(Uuid::new_v4(), None);
            let member = test_member(company.id, user.uuid, CompanyRole::Member, status.clone());
            let target = Target::Company {
                company: &company,
                membership: Some(&member),
            };
            assert!(
                can_perform(&user, &target, Action::Read),
                "status {:?} should read",
                status
            );
        }
    }

    #[test]
    fn pending_admin_cannot_update() {
        let company = test_company(Uuid::new_v4());
        let user = test_user(Uuid::new_v4(), None);
        let member = test_member(
            company.id,
            user.uuid,
            CompanyRole::Admin,
            MemberStatus::Pending,
        );
        let target = Target::Company {
            company: &company,
            membership: Some(&member),
        };

        assert!(can_perform(&user, &target, Action::Read));
        assert!(!can_perform(&user, &target, Action::Update));
        assert!(!can_perform(&user, &target, Action::InviteMember));
    }

    #[test]
    fn non_member_is_denied() {
        let company = test_company(Uuid::new_v4());
        let user = test_user(Uuid::new_v4(), None);
        let target = Target::Company {
            company: &company,
            membership: None,
        };

        assert!(!can_perform(&user, &target, Action::Read));
        assert!(!can_perform(&user, &target, Action::Update));
        assert!(!can_perform(&user, &target, Action::Delete));
    }

    #[test]
    fn company_owner_needs_no_membership_row() {
        let owner_uuid = Uuid::new_v4();
        let company = test_company(owner_uuid);
        let owner = test_user(owner_uuid, None);
        let target = Target::Company {
            company: &company,
            membership: None,
        };

        assert!(can_perform(&owner, &target, Action::Delete));
        assert!(can_perform(&owner, &target, Action::RemoveMember));
    }

    #[test]
    fn project_owner_and_company_sharing() {
        let owner_uuid = Uuid::new_v4();
        let project = test_project(owner_uuid, Some(10));

        let owner = test_user(owner_uuid, None);
        assert!(can_perform(&owner, &Target::Project(&project), Action::Delete));

        let colleague = test_user(Uuid::new_v4(), Some(10));
        assert!(can_perform(
            &colleague,
            &Target::Project(&project),
            Action::Read
        ));
        assert!(can_perform(
            &colleague,
            &Target::Project(&project),
            Action::Update
        ));
        assert!(!can_perform(
            &colleague,
            &Target::Project(&project),
            Action::Delete
        ));

        let outsider = test_user(Uuid::new_v4(), Some(99));
        assert!(!can_perform(
            &outsider,
            &Target::Project(&project),
            Action::Read
        ));
    }

    #[test]
    fn project_team_member_can_edit_but_not_delete() {
        let member_uuid = Uuid::new_v4();
        let mut project = test_project(Uuid::new_v4(), None);
        project.team = serde_json::json!([member_uuid]);

        let member = test_user(member_uuid, None);
        assert!(can_perform(&member, &Target::Project(&project), Action::Read));
        assert!(can_perform(
            &member,
            &Target::Project(&project),
            Action::Update
        ));
        assert!(!can_perform(
            &member,
            &Target::Project(&project),
            Action::Delete
        ));
    }

    #[test]
    fn video_visibility() {
        let uploader_uuid = Uuid::new_v4();
        let video = test_video(uploader_uuid, Some(10), false);

        let uploader = test_user(uploader_uuid, None);
        assert!(can_perform(&uploader, &Target::Video(&video), Action::Delete));

        let colleague = test_user(Uuid::new_v4(), Some(10));
        assert!(can_perform(&colleague, &Target::Video(&video), Action::Read));
        assert!(can_perform(
            &colleague,
            &Target::Video(&video),
            Action::Update
        ));
        assert!(can_perform(
            &colleague,
            &Target::Video(&video),
            Action::Delete
        ));

        let outsider = test_user(Uuid::new_v4(), None);
        assert!(!can_perform(&outsider, &Target::Video(&video), Action::Read));

        let public_video = test_video(uploader_uuid, Some(10), true);
        assert!(can_perform(
            &outsider,
            &Target::Video(&public_video),
            Action::Read
        ));
        assert!(!can_perform(
            &outsider,
            &Target::Video(&public_video),
            Action::Update
        ));
    }
}
