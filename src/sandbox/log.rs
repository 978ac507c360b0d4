//! Cast logging
//!
//! Records everything the sandbox host is asked to do (notices, cues,
//! incantations, damage, healing, modifiers, travel, skill use) for the viewer,
//! the headless report and test assertions.

use crate::host::EntityId;

/// A single entry in the cast log
#[derive(Debug, Clone)]
pub struct CastLogEntry {
    /// Simulation time in seconds
    pub timestamp: f32,
    /// Actor the entry concerns, if any
    pub actor: Option<EntityId>,
    /// The type of event
    pub event_type: CastLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of cast log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastLogEventType {
    /// User-visible notice
    Notice,
    /// Audio/visual cue
    Cue,
    /// Incantation heard by a player
    Incantation,
    /// Damage dealt
    Damage,
    /// Healing or curing
    Healing,
    /// Buff/curse applied
    Modifier,
    /// Teleport, mark or remote trigger
    Travel,
    /// Skill gain attempt or targeted skill use
    Skill,
    /// Scenario event (start, end, injected input)
    Scenario,
}

impl CastLogEventType {
    pub fn label(&self) -> &'static str {
        match self {
            CastLogEventType::Notice => "notice",
            CastLogEventType::Cue => "cue",
            CastLogEventType::Incantation => "incantation",
            CastLogEventType::Damage => "damage",
            CastLogEventType::Healing => "healing",
            CastLogEventType::Modifier => "modifier",
            CastLogEventType::Travel => "travel",
            CastLogEventType::Skill => "skill",
            CastLogEventType::Scenario => "scenario",
        }
    }
}

/// Chronological cast log
#[derive(Debug, Default, Clone)]
pub struct CastLog {
    /// All log entries in chronological order
    pub entries: Vec<CastLogEntry>,
    /// Current simulation time in seconds
    pub time: f32,
}

impl CastLog {
    /// Clear the log for a new run
    pub fn clear(&mut self) {
        self.entries.clear();
        self.time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CastLogEventType, actor: Option<EntityId>, message: String) {
        self.entries.push(CastLogEntry {
            timestamp: self.time,
            actor,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CastLogEventType) -> Vec<&CastLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Entries concerning one actor
    pub fn for_actor(&self, actor: EntityId) -> Vec<&CastLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.actor == Some(actor))
            .collect()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CastLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CastLogEventType::Damage | CastLogEventType::Healing
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CastLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_take_current_time() {
        let mut log = CastLog::default();
        log.log(CastLogEventType::Scenario, None, "start".to_string());
        log.time = 1.5;
        log.log(CastLogEventType::Damage, Some(EntityId(1)), "hit".to_string());
        assert_eq!(log.entries[0].timestamp, 0.0);
        assert_eq!(log.entries[1].timestamp, 1.5);
    }

    #[test]
    fn test_filters() {
        let mut log = CastLog::default();
        log.log(CastLogEventType::Damage, Some(EntityId(1)), "a".to_string());
        log.log(CastLogEventType::Healing, Some(EntityId(2)), "b".to_string());
        log.log(CastLogEventType::Cue, Some(EntityId(1)), "c".to_string());
        assert_eq!(log.hp_changes_only().len(), 2);
        assert_eq!(log.for_actor(EntityId(1)).len(), 2);
        assert_eq!(log.filter_by_type(CastLogEventType::Cue).len(), 1);
        let recent: Vec<_> = log.recent(2).iter().map(|e| e.message.as_str()).collect();
        assert_eq!(recent, vec!["b", "c"]);
    }
}
