//! In-memory party membership.
//!
//! A party groups users around a shared (id, match, session) triple
//! reported by their clients. The member at position 0 is the leader;
//! followers are authorized to read the leader's stations and bindings.
//! Parties are ephemeral and never persisted.

use parking_lot::Mutex;
use rb_core::{Error, Result};
use serde::Deserialize;

/// Party descriptor reported by a client when joining.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientParty {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "match")]
    pub match_id: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub leader: bool,
}

fn is_hex_id(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl ClientParty {
    /// Whether all identifier fields have the expected shapes:
    /// `V2:` plus 32 hex for the party id, bare 32 hex for match and session.
    pub fn is_valid(&self) -> bool {
        let party_id_ok = self
            .id
            .strip_prefix("V2:")
            .map(is_hex_id)
            .unwrap_or(false);
        party_id_ok && is_hex_id(&self.match_id) && is_hex_id(&self.session)
    }
}

/// A party: identifiers plus the ordered member list (leader first).
#[derive(Debug, Clone)]
pub struct Party {
    pub id: String,
    pub match_id: String,
    pub session: String,
    pub members: Vec<String>,
}

impl Party {
    pub fn leader(&self) -> &str {
        &self.members[0]
    }
}

/// Mutex-guarded collection of all active parties.
#[derive(Debug, Default)]
pub struct PartyStore {
    parties: Mutex<Vec<Party>>,
}

impl PartyStore {
    /// Remove a user from whatever party they are in. A departing leader
    /// dissolves the whole party. Returns true if the user was a member
    /// of anything.
    pub fn remove_user(&self, user: &str) -> bool {
        let mut parties = self.parties.lock();

        for (i, party) in parties.iter_mut().enumerate() {
            if let Some(j) = party.members.iter().position(|m| m == user) {
                if j == 0 {
                    parties.remove(i);
                } else {
                    party.members.remove(j);
                }
                return true;
            }
        }

        false
    }

    /// Join the party matching the client descriptor, or create it when
    /// the client claims leadership.
    pub fn create_or_join(&self, user: &str, client: &ClientParty) -> Result<Party> {
        let mut parties = self.parties.lock();

        for party in parties.iter_mut() {
            if party.id == client.id
                && party.match_id == client.match_id
                && party.session == client.session
            {
                if client.leader {
                    return Err(Error::Validation("party already exists".into()));
                }

                party.members.push(user.to_string());
                return Ok(party.clone());
            }
        }

        if !client.leader {
            return Err(Error::Validation("party doesn't exist".into()));
        }

        let party = Party {
            id: client.id.clone(),
            match_id: client.match_id.clone(),
            session: client.session.clone(),
            members: vec![user.to_string()],
        };
        parties.push(party.clone());

        Ok(party)
    }

    /// The party the user currently belongs to, if any.
    pub fn user_party(&self, user: &str) -> Option<Party> {
        self.parties
            .lock()
            .iter()
            .find(|p| p.members.iter().any(|m| m == user))
            .cloned()
    }

    /// The leader of the user's party, if the user is in one.
    pub fn leader_of(&self, user: &str) -> Option<String> {
        self.user_party(user).map(|p| p.leader().to_string())
    }
}
