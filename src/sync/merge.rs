//! Sub-collection merge rules for receipts and reactions.

use crate::store::{Reaction, UserReceipt};

/// Replace the entry for the receipt's user, or append it.
pub fn merge_receipt(mut receipts: Vec<UserReceipt>, incoming: UserReceipt) -> Vec<UserReceipt> {
    receipts.retain(|r| r.user_jid != incoming.user_jid);
    receipts.push(incoming);
    receipts
}

/// Drop the author's previous reaction; keep the new one unless it is a
/// removal (empty text).
pub fn apply_reaction(mut reactions: Vec<Reaction>, incoming: Reaction) -> Vec<Reaction> {
    let author = incoming.author();
    reactions.retain(|r| r.author() != author);
    if !incoming.is_removal() {
        reactions.push(incoming);
    }
    reactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::MessageKey;
    use serde_json::{Map, json};

    fn receipt(user: &str, ts: i64) -> UserReceipt {
        let mut fields = Map::new();
        fields.insert("readTimestamp".into(), json!(ts));
        UserReceipt {
            user_jid: user.into(),
            fields,
        }
    }

    fn reaction(from_me: bool, participant: &str, text: &str) -> Reaction {
        Reaction {
            key: Some(MessageKey {
                remote_jid: Some("g@g.us".into()),
                from_me: Some(from_me),
                participant: Some(participant.into()),
                id: None,
            }),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_receipts_stay_unique_per_user() {
        let list = merge_receipt(Vec::new(), receipt("u1", 1));
        let list = merge_receipt(list, receipt("u2", 2));
        let list = merge_receipt(list, receipt("u1", 3));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].user_jid, "u2");
        assert_eq!(list[1].fields["readTimestamp"], json!(3));
    }

    #[test]
    fn test_reaction_replace_and_remove() {
        let list = apply_reaction(Vec::new(), reaction(true, "", "👍"));
        let list = apply_reaction(list, reaction(false, "p@s.whatsapp.net", "😂"));
        let list = apply_reaction(list, reaction(true, "", "❤️"));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].text.as_deref(), Some("❤️"));

        let list = apply_reaction(list, reaction(true, "", ""));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].author(), "p@s.whatsapp.net");
    }

    #[test]
    fn test_removal_without_prior_entry_is_noop() {
        let list = apply_reaction(Vec::new(), reaction(false, "p@s.whatsapp.net", ""));
        assert!(list.is_empty());
    }
}
