use serenity::all::RoleId;

use crate::bot::data::Context;
use crate::bot::error::Error;

/// Whether any of the member's roles is on the allow list
pub fn roles_allow(member_roles: &[RoleId], allowed: &[u64]) -> bool {
    member_roles.iter().any(|r| allowed.contains(&r.get()))
}

/// Check if the invoking member has administrator permissions
pub async fn is_admin(ctx: Context<'_>) -> bool {
    let Some(member) = ctx.author_member().await else {
        return false;
    };

    if let Some(permissions) = member.permissions {
        return permissions.administrator();
    }
    member
        .permissions(ctx.serenity_context())
        .map(|p| p.administrator())
        .unwrap_or(false)
}

/// Administrators always pass. Everyone else needs one of the `allowed` roles.
pub async fn ensure_access(ctx: Context<'_>, allowed: &[u64]) -> Result<(), Error> {
    if is_admin(ctx).await {
        return Ok(());
    }

    let permitted = match ctx.author_member().await {
        Some(member) => roles_allow(&member.roles, allowed),
        None => false,
    };
    if permitted {
        Ok(())
    } else {
        Err(Error::PermissionDenied(
            "You do not have a role that can use this command".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_allow() {
        let roles = vec![RoleId::new(10), RoleId::new(20)];
        assert!(roles_allow(&roles, &[20, 30]));
        assert!(!roles_allow(&roles, &[30]));
        assert!(!roles_allow(&roles, &[]));
        assert!(!roles_allow(&[], &[10]));
    }
}
