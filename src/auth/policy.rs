//! Who may do what to which resource.
//!
//! The whole authorization model is a single table of `(role, action, rule)`
//! rows. Handlers and store operations never branch on ownership themselves;
//! they look up the owner of the target row and ask [`authorize`].

/// The identity a request acts as, resolved from its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    /// Logged in with username and password.
    User(i64),
    /// Logged in and confirmed with a TOTP code.
    Admin(i64),
}

impl Actor {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Actor::Anonymous => None,
            Actor::User(id) | Actor::Admin(id) => Some(*id),
        }
    }

    fn role(&self) -> Role {
        match self {
            Actor::Anonymous => Role::Anonymous,
            Actor::User(_) => Role::User,
            Actor::Admin(_) => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadPosts,
    ReadAnonymousComments,
    /// Every comment, with the viewer's interesting flag resolved.
    ReadAllComments,
    CreatePost,
    CreateComment,
    /// Edit or delete a post or comment.
    Modify,
    /// Flag or unflag a comment as interesting.
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Anonymous,
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Always,
    /// The target must be owned by the acting user. Ownerless targets fail.
    OwnerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("authentication required")]
    Unauthenticated,
    #[error("not permitted")]
    Forbidden,
}

const RULES: &[(Role, Action, Rule)] = &[
    (Role::Anonymous, Action::ReadPosts, Rule::Always),
    (Role::Anonymous, Action::ReadAnonymousComments, Rule::Always),
    (Role::Anonymous, Action::CreateComment, Rule::Always),
    (Role::User, Action::ReadPosts, Rule::Always),
    (Role::User, Action::ReadAnonymousComments, Rule::Always),
    (Role::User, Action::ReadAllComments, Rule::Always),
    (Role::User, Action::CreatePost, Rule::Always),
    (Role::User, Action::CreateComment, Rule::Always),
    (Role::User, Action::Modify, Rule::OwnerOnly),
    (Role::User, Action::Flag, Rule::Always),
    (Role::Admin, Action::ReadPosts, Rule::Always),
    (Role::Admin, Action::ReadAnonymousComments, Rule::Always),
    (Role::Admin, Action::ReadAllComments, Rule::Always),
    (Role::Admin, Action::CreatePost, Rule::Always),
    (Role::Admin, Action::CreateComment, Rule::Always),
    (Role::Admin, Action::Modify, Rule::Always),
    (Role::Admin, Action::Flag, Rule::Always),
];

/// Decide whether `actor` may perform `action` on a resource owned by `owner`.
///
/// `owner` is `None` both for ownerless resources (anonymous comments) and for
/// actions without a target. Anything not listed in the table is denied;
/// anonymous denials report [`Denied::Unauthenticated`] so callers can ask
/// for a login instead of hiding the resource.
pub fn authorize(actor: Actor, action: Action, owner: Option<i64>) -> Result<(), Denied> {
    let role = actor.role();
    let rule = RULES
        .iter()
        .find(|(r, a, _)| *r == role && *a == action)
        .map(|(_, _, rule)| *rule);

    let allowed = match rule {
        Some(Rule::Always) => true,
        Some(Rule::OwnerOnly) => owner.is_some() && owner == actor.user_id(),
        None => false,
    };

    if allowed {
        Ok(())
    } else if actor == Actor::Anonymous {
        Err(Denied::Unauthenticated)
    } else {
        Err(Denied::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;

    #[test]
    fn anonymous_can_read_public_data_and_comment() {
        let anon = Actor::Anonymous;
        assert!(authorize(anon, Action::ReadPosts, None).is_ok());
        assert!(authorize(anon, Action::ReadAnonymousComments, None).is_ok());
        assert!(authorize(anon, Action::CreateComment, None).is_ok());
    }

    #[test]
    fn anonymous_is_asked_to_authenticate_for_everything_else() {
        let anon = Actor::Anonymous;
        for action in [
            Action::ReadAllComments,
            Action::CreatePost,
            Action::Modify,
            Action::Flag,
        ] {
            assert_eq!(
                authorize(anon, action, Some(ALICE)),
                Err(Denied::Unauthenticated),
                "{:?}",
                action
            );
        }
    }

    #[test]
    fn user_can_modify_only_own_resources() {
        let alice = Actor::User(ALICE);
        assert!(authorize(alice, Action::Modify, Some(ALICE)).is_ok());
        assert_eq!(
            authorize(alice, Action::Modify, Some(BOB)),
            Err(Denied::Forbidden)
        );
    }

    #[test]
    fn user_cannot_modify_ownerless_comments() {
        assert_eq!(
            authorize(Actor::User(ALICE), Action::Modify, None),
            Err(Denied::Forbidden)
        );
    }

    #[test]
    fn user_can_create_read_and_flag() {
        let alice = Actor::User(ALICE);
        for action in [
            Action::ReadPosts,
            Action::ReadAllComments,
            Action::CreatePost,
            Action::CreateComment,
            Action::Flag,
        ] {
            assert!(authorize(alice, action, Some(BOB)).is_ok(), "{:?}", action);
        }
    }

    #[test]
    fn admin_overrides_ownership() {
        let admin = Actor::Admin(ALICE);
        assert!(authorize(admin, Action::Modify, Some(BOB)).is_ok());
        assert!(authorize(admin, Action::Modify, None).is_ok());
        assert!(authorize(admin, Action::Modify, Some(ALICE)).is_ok());
    }

    #[test]
    fn user_id_is_exposed_for_logged_in_actors() {
        assert_eq!(Actor::Anonymous.user_id(), None);
        assert_eq!(Actor::User(7).user_id(), Some(7));
        assert_eq!(Actor::Admin(9).user_id(), Some(9));
    }
}
