/// Strip a protocol resource (`user@host/resource`) from a sender id,
/// leaving the stable part used to find its conversation.
pub fn normalize(sender: &str) -> &str {
    sender.split_once('/').map_or(sender, |(bare, _)| bare)
}
