//! JID helpers

/// Legacy user server that older clients still emit.
const LEGACY_USER_SERVER: &str = "c.us";
const USER_SERVER: &str = "s.whatsapp.net";

/// Normalize a JID to its user form: drop the `:device` suffix from the user
/// part and map the legacy `c.us` server to `s.whatsapp.net`.
///
/// Strings without an `@` are returned unchanged.
pub fn normalized_user(jid: &str) -> String {
    let Some((user, server)) = jid.split_once('@') else {
        return jid.to_string();
    };
    let user = user.split(':').next().unwrap_or(user);
    let server = if server == LEGACY_USER_SERVER {
        USER_SERVER
    } else {
        server
    };
    format!("{user}@{server}")
}
