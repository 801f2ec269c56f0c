//! Viewer access resolution and mutation gating.
//!
//! The viewer is matched against the board member list by display name or
//! email, case-insensitively, because the membership records carry no
//! canonical foreign key to the account space. When two members share a
//! display name the first match in member-list order wins - a known
//! ambiguity inherited from the data model, deliberately not papered over
//! here.
//!
//! The gate is enforced at the session's mutation entry points, not in any
//! rendering layer: a read-only viewer's delete call is refused before a
//! remote request can be issued.

use plank_types::{Board, Identity, Role, Visibility};

/// What the viewer may do with the mounted board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Owner or Editor membership.
    ReadWrite,
    /// Viewer membership, or non-member on a public board.
    ReadOnly,
    /// Non-member on a private board. Mount fails outright.
    Denied,
}

impl Access {
    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Resolve the viewer's access level for a board.
#[must_use]
pub fn resolve_access(board: &Board, viewer: &Identity) -> Access {
    let membership = board.members.iter().find(|m| {
        eq_ignore_case(&m.name, &viewer.name) || eq_ignore_case(&m.email, &viewer.email)
    });

    match membership {
        Some(member) => match member.role {
            Role::Owner | Role::Editor => Access::ReadWrite,
            Role::Viewer => Access::ReadOnly,
        },
        None => match board.visibility {
            Visibility::Public => Access::ReadOnly,
            Visibility::Private => Access::Denied,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{Access, resolve_access};
    use plank_types::{Board, EntityId, Identity, Member, Role, Visibility};

    fn member(name: &str, email: &str, role: Role) -> Member {
        Member {
            membership_id: EntityId::confirmed("m1"),
            user_id: "u1".into(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    fn board(visibility: Visibility, members: Vec<Member>) -> Board {
        Board {
            id: EntityId::confirmed("b1"),
            visibility,
            members,
            ..Board::default()
        }
    }

    fn viewer(name: &str, email: &str) -> Identity {
        Identity {
            id: "acct_1".into(),
            name: name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn owner_and_editor_get_read_write() {
        let b = board(
            Visibility::Private,
            vec![member("Ada", "ada@example.com", Role::Owner)],
        );
        assert_eq!(resolve_access(&b, &viewer("Ada", "x@y.z")), Access::ReadWrite);

        let b = board(
            Visibility::Private,
            vec![member("Ada", "ada@example.com", Role::Editor)],
        );
        assert_eq!(resolve_access(&b, &viewer("Ada", "x@y.z")), Access::ReadWrite);
    }

    #[test]
    fn matching_is_case_insensitive_on_name_or_email() {
        let b = board(
            Visibility::Private,
            vec![member("Ada Lovelace", "ada@example.com", Role::Editor)],
        );
        assert_eq!(
            resolve_access(&b, &viewer("ADA LOVELACE", "nope@example.com")),
            Access::ReadWrite
        );
        assert_eq!(
            resolve_access(&b, &viewer("Somebody Else", "ADA@EXAMPLE.COM")),
            Access::ReadWrite
        );
    }

    #[test]
    fn viewer_role_is_read_only() {
        let b = board(
            Visibility::Private,
            vec![member("Ada", "ada@example.com", Role::Viewer)],
        );
        assert_eq!(resolve_access(&b, &viewer("Ada", "")), Access::ReadOnly);
    }

    #[test]
    fn non_member_depends_on_visibility() {
        let public = board(Visibility::Public, vec![]);
        assert_eq!(
            resolve_access(&public, &viewer("Stranger", "s@x.y")),
            Access::ReadOnly
        );

        let private = board(Visibility::Private, vec![]);
        assert_eq!(
            resolve_access(&private, &viewer("Stranger", "s@x.y")),
            Access::Denied
        );
    }

    #[test]
    fn empty_fields_never_match() {
        let b = board(
            Visibility::Public,
            vec![member("", "", Role::Owner)],
        );
        assert_eq!(resolve_access(&b, &viewer("", "")), Access::ReadOnly);
    }
}
