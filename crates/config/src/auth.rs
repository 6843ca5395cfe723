//! Connection-string auth-type classification for telemetry.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    Scram,
    Ldap,
    Kerberos,
    OidcAuthFlow,
    OidcDeviceFlow,
    X509,
}

impl AuthType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scram => "scram",
            Self::Ldap => "ldap",
            Self::Kerberos => "kerberos",
            Self::OidcAuthFlow => "oidc-auth-flow",
            Self::OidcDeviceFlow => "oidc-device-flow",
            Self::X509 => "x.509",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the auth type from a MongoDB URI. The default (no `authMechanism`
/// option) is SCRAM; OIDC splits on whether a device-flow environment is
/// requested through `authMechanismProperties`.
pub fn connection_string_auth_type(uri: &str) -> AuthType {
    let query = uri.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut mechanism = None;
    let mut properties = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key.eq_ignore_ascii_case("authMechanism") {
            mechanism = Some(value);
        } else if key.eq_ignore_ascii_case("authMechanismProperties") {
            properties = Some(value);
        }
    }

    match mechanism {
        Some(m) if m.eq_ignore_ascii_case("GSSAPI") => AuthType::Kerberos,
        Some(m) if m.eq_ignore_ascii_case("PLAIN") => AuthType::Ldap,
        Some(m) if m.eq_ignore_ascii_case("MONGODB-X509") => AuthType::X509,
        Some(m) if m.eq_ignore_ascii_case("MONGODB-OIDC") => {
            let device_flow = properties
                .map(|p| p.to_ascii_uppercase().contains("ENVIRONMENT"))
                .unwrap_or(false);
            if device_flow {
                AuthType::OidcDeviceFlow
            } else {
                AuthType::OidcAuthFlow
            }
        }
        _ => AuthType::Scram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_scram() {
        assert_eq!(
            connection_string_auth_type("mongodb://localhost:27017"),
            AuthType::Scram
        );
        assert_eq!(
            connection_string_auth_type("mongodb://u:p@host/?authMechanism=SCRAM-SHA-256"),
            AuthType::Scram
        );
    }

    #[test]
    fn classifies_explicit_mechanisms() {
        assert_eq!(
            connection_string_auth_type("mongodb://host/?authMechanism=GSSAPI"),
            AuthType::Kerberos
        );
        assert_eq!(
            connection_string_auth_type("mongodb://host/?authMechanism=PLAIN"),
            AuthType::Ldap
        );
        assert_eq!(
            connection_string_auth_type("mongodb://host/?authMechanism=MONGODB-X509"),
            AuthType::X509
        );
    }

    #[test]
    fn oidc_splits_on_environment_property() {
        // ENVIRONMENT marks an automated/device-style flow; without it the
        // driver runs the interactive callback flow.
        assert_eq!(
            connection_string_auth_type(
                "mongodb://host/?authMechanism=MONGODB-OIDC&authMechanismProperties=ENVIRONMENT:azure"
            ),
            AuthType::OidcDeviceFlow
        );
        assert_eq!(
            connection_string_auth_type("mongodb://host/?authMechanism=MONGODB-OIDC"),
            AuthType::OidcAuthFlow
        );
    }
}
