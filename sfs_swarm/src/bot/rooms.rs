//! Room-name resolution against the live room listing.

use crate::facade::{ProtocolClient, RoomInfo};

/// World prefix some servers put in front of room category names
pub const WORLD_PREFIX: &str = "w1#";

/// Rooms the client knows about: the primary listing, else the secondary
/// one, else nothing.
pub fn known_rooms<C: ProtocolClient + ?Sized>(client: &C) -> Vec<RoomInfo> {
    client
        .room_list()
        .or_else(|| client.room_manager_rooms())
        .unwrap_or_default()
}

/// Resolve a room category such as `lobby` to a concrete instance such as
/// `lobby@2`.
///
/// Names that already contain `@` are returned as given (trimmed). Otherwise
/// the busiest room named after the base (with or without the world prefix),
/// or prefixed by it and `@`, wins; ties go to the first listed. With no
/// match the trimmed base is returned and the join is left to fail on the
/// server.
pub fn resolve_room_name(base: &str, rooms: &[RoomInfo]) -> String {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return base.to_string();
    }
    if trimmed.contains('@') {
        return trimmed.to_string();
    }

    let stripped = trimmed.strip_prefix(WORLD_PREFIX).unwrap_or(trimmed);
    let prefixed = if trimmed.starts_with(WORLD_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{WORLD_PREFIX}{trimmed}")
    };
    let forms = [trimmed, prefixed.as_str(), stripped];

    let matches = |name: &str| {
        forms.iter().any(|&form| {
            name == form
                || name
                    .strip_prefix(form)
                    .is_some_and(|rest| rest.starts_with('@'))
        })
    };

    let mut best: Option<&RoomInfo> = None;
    for room in rooms.iter().filter(|room| matches(&room.name)) {
        if best.is_none_or(|b| room.user_count > b.user_count) {
            best = Some(room);
        }
    }

    best.map_or_else(|| trimmed.to_string(), |room| room.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::{FacadeError, Request};

    fn rooms(list: &[(&str, i64)]) -> Vec<RoomInfo> {
        list.iter().map(|(n, c)| RoomInfo::new(*n, *c)).collect()
    }

    #[test]
    fn test_busiest_instance_wins() {
        let listing = rooms(&[("lobby@1", 3), ("lobby@2", 9), ("other@1", 50)]);
        assert_eq!(resolve_room_name("lobby", &listing), "lobby@2");
    }

    #[test]
    fn test_qualified_name_unchanged() {
        let listing = rooms(&[("lobby@2", 9)]);
        assert_eq!(resolve_room_name(" lobby@7 ", &listing), "lobby@7");
    }

    #[test]
    fn test_blank_base_unchanged() {
        assert_eq!(resolve_room_name("  ", &[]), "  ");
    }

    #[test]
    fn test_no_match_returns_base() {
        let listing = rooms(&[("other@1", 5)]);
        assert_eq!(resolve_room_name(" lobby ", &listing), "lobby");
        assert_eq!(resolve_room_name("lobby", &[]), "lobby");
    }

    #[test]
    fn test_world_prefix_forms() {
        let listing = rooms(&[("w1#lobby@1", 4), ("lobby@3", 2)]);
        assert_eq!(resolve_room_name("lobby", &listing), "w1#lobby@1");

        let listing = rooms(&[("w1#lobby@1", 1), ("lobby@3", 2)]);
        assert_eq!(resolve_room_name("w1#lobby", &listing), "lobby@3");
    }

    #[test]
    fn test_prefix_needs_separator() {
        let listing = rooms(&[("lobbyist@1", 40), ("lobby", 1)]);
        assert_eq!(resolve_room_name("lobby", &listing), "lobby");
    }

    #[test]
    fn test_ties_keep_first() {
        let listing = rooms(&[("lobby@1", 5), ("lobby@2", 5)]);
        assert_eq!(resolve_room_name("lobby", &listing), "lobby@1");
    }

    struct Listings {
        primary: Option<Vec<RoomInfo>>,
        secondary: Option<Vec<RoomInfo>>,
    }

    impl ProtocolClient for Listings {
        fn connect(&mut self, _: &str, _: u16, _: bool) {}

        fn send(&mut self, _: Request) -> Result<(), FacadeError> {
            Ok(())
        }

        fn room_list(&self) -> Option<Vec<RoomInfo>> {
            self.primary.clone()
        }

        fn room_manager_rooms(&self) -> Option<Vec<RoomInfo>> {
            self.secondary.clone()
        }
    }

    #[test]
    fn test_known_rooms_fallback() {
        let both = Listings {
            primary: Some(rooms(&[("a", 1)])),
            secondary: Some(rooms(&[("b", 1)])),
        };
        assert_eq!(known_rooms(&both), rooms(&[("a", 1)]));

        let secondary_only = Listings {
            primary: None,
            secondary: Some(rooms(&[("b", 1)])),
        };
        assert_eq!(known_rooms(&secondary_only), rooms(&[("b", 1)]));

        let neither = Listings {
            primary: None,
            secondary: None,
        };
        assert!(known_rooms(&neither).is_empty());
    }
}
