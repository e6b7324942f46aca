//! Supported protocol versions.
//!
//! The server speaks exactly one wire protocol. Clients on anything else
//! get a friendly disconnect that names the game versions they need.

/// The protocol number carried in the Login packet.
pub const PROTOCOL_VERSION: i32 = 91;

/// Protocol numbers this server accepts, with the game version each maps to.
pub const COMPATIBLE_VERSIONS: &[(i32, &str)] = &[(PROTOCOL_VERSION, "0.16.0")];

/// Returns `true` if a client on `protocol` can log in.
pub fn is_compatible(protocol: i32) -> bool {
    COMPATIBLE_VERSIONS.iter().any(|(v, _)| *v == protocol)
}

/// Joins the compatible game versions for display: `"a"`, `"a or b"`,
/// `"a, b or c"`.
pub fn human_version_list() -> String {
    join_with_or(COMPATIBLE_VERSIONS.iter().map(|(_, name)| *name))
}

fn join_with_or<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

/// The disconnect reason sent to a client on an unsupported version.
pub fn unsupported_version_message() -> String {
    format!(
        "This server requires Minecraft: Pocket Edition {}",
        human_version_list()
    )
}
