// src/services/access_gate.rs

use std::collections::HashSet;
use std::fmt;

use crate::{
    config::settings::Settings,
    models::{auth::Identity, tenancy::MemberRole},
};

/// As três capacidades de acesso do sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Admin,
    FloorOperator,
    BrandPortal,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Admin => "admin",
            Capability::FloorOperator => "floor-operator",
            Capability::BrandPortal => "brand-portal",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quem está pedindo: a identidade verificada e, se houver, o papel na organização.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub identity: Option<&'a Identity>,
    pub role: Option<MemberRole>,
}

// ---
// O Portão de Acesso
// ---
// Decisão pura sobre a identidade; não consulta o banco.
#[derive(Debug, Clone)]
pub struct AccessGate {
    allowlist: HashSet<String>,
    open_when_unconfigured: bool,
}

impl AccessGate {
    pub fn new<I, S>(admin_emails: I, open_when_unconfigured: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowlist: HashSet<String> = admin_emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        // Com allowlist configurada o modo aberto nunca se aplica
        let open_when_unconfigured = open_when_unconfigured && allowlist.is_empty();
        Self { allowlist, open_when_unconfigured }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.admin_emails, settings.admin_open_by_default())
    }

    pub fn is_open(&self) -> bool {
        self.open_when_unconfigured
    }

    pub fn is_admin(&self, caller: Caller<'_>) -> bool {
        // Sem identidade não há acesso, nem no modo aberto
        let Some(identity) = caller.identity else {
            return false;
        };

        identity.profile_role.as_deref() == Some("admin")
            || identity
                .verified_email()
                .is_some_and(|email| self.allowlist.contains(email))
            || self.open_when_unconfigured
            || matches!(caller.role, Some(MemberRole::Owner | MemberRole::Admin))
    }

    pub fn can_access(&self, caller: Caller<'_>, capability: Capability) -> bool {
        if caller.identity.is_none() {
            return false;
        }
        match capability {
            Capability::Admin => self.is_admin(caller),
            Capability::FloorOperator => {
                self.is_admin(caller) || caller.role == Some(MemberRole::Operator)
            }
            Capability::BrandPortal => self.is_admin(caller) || caller.role == Some(MemberRole::Brand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: Option<&str>, verified: bool, role: Option<&str>) -> Identity {
        Identity {
            subject: "user_1".into(),
            email: email.map(str::to_string),
            email_verified: verified,
            profile_role: role.map(str::to_string),
        }
    }

    fn caller(identity: &Identity, role: Option<MemberRole>) -> Caller<'_> {
        Caller { identity: Some(identity), role }
    }

    #[test]
    fn test_no_identity_is_always_denied() {
        let gate = AccessGate::new(Vec::<String>::new(), true);
        let anonymous = Caller { identity: None, role: Some(MemberRole::Owner) };
        for capability in [Capability::Admin, Capability::FloorOperator, Capability::BrandPortal] {
            assert!(!gate.can_access(anonymous, capability));
        }
    }

    #[test]
    fn test_profile_role_admin_grants_admin() {
        let gate = AccessGate::new(["chefe@fabrica.com"], false);
        let id = identity(None, false, Some("admin"));
        assert!(gate.can_access(caller(&id, None), Capability::Admin));
    }

    #[test]
    fn test_allowlist_needs_verified_email() {
        let gate = AccessGate::new([" Chefe@Fabrica.com "], false);

        let verified = identity(Some("chefe@fabrica.com"), true, None);
        assert!(gate.can_access(caller(&verified, None), Capability::Admin));

        let unverified = identity(Some("chefe@fabrica.com"), false, None);
        assert!(!gate.can_access(caller(&unverified, None), Capability::Admin));
    }

    #[test]
    fn test_open_mode_only_without_allowlist() {
        let anyone = identity(Some("visitante@x.com"), true, None);

        let open = AccessGate::new(Vec::<String>::new(), true);
        assert!(open.is_open());
        assert!(open.can_access(caller(&anyone, None), Capability::Admin));

        let configured = AccessGate::new(["chefe@fabrica.com"], true);
        assert!(!configured.is_open());
        assert!(!configured.can_access(caller(&anyone, None), Capability::Admin));

        let closed = AccessGate::new(Vec::<String>::new(), false);
        assert!(!closed.can_access(caller(&anyone, None), Capability::Admin));
    }

    #[test]
    fn test_membership_roles_map_to_capabilities() {
        let gate = AccessGate::new(["chefe@fabrica.com"], false);
        let id = identity(Some("fulano@fabrica.com"), true, None);

        assert!(gate.can_access(caller(&id, Some(MemberRole::Owner)), Capability::Admin));
        assert!(gate.can_access(caller(&id, Some(MemberRole::Admin)), Capability::BrandPortal));

        assert!(gate.can_access(caller(&id, Some(MemberRole::Operator)), Capability::FloorOperator));
        assert!(!gate.can_access(caller(&id, Some(MemberRole::Operator)), Capability::Admin));
        assert!(!gate.can_access(caller(&id, Some(MemberRole::Operator)), Capability::BrandPortal));

        assert!(gate.can_access(caller(&id, Some(MemberRole::Brand)), Capability::BrandPortal));
        assert!(!gate.can_access(caller(&id, Some(MemberRole::Brand)), Capability::FloorOperator));

        assert!(!gate.can_access(caller(&id, None), Capability::FloorOperator));
    }
}
