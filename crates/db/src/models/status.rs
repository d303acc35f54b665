//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use vidbatch_core::settlement::{BatchOutcome, SettlementKind};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Seed-data name of this status.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Batch job lifecycle status.
    BatchJobStatus {
        Queued = 1 => "queued",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Partial = 4 => "partial",
        Failed = 5 => "failed",
    }
}

define_status_enum! {
    /// How a batch's escrowed credits were resolved.
    SettlementStatus {
        Pending = 1 => "pending",
        Refunded = 2 => "refunded",
        Finalized = 3 => "finalized",
    }
}

define_status_enum! {
    /// Per-video task status.
    ///
    /// `Queued` is accepted as a not-yet-dispatched state alongside `Pending`
    /// for rows written by older submission flows.
    VideoTaskStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Succeeded = 3 => "succeeded",
        Failed = 4 => "failed",
        Queued = 5 => "queued",
    }
}

define_status_enum! {
    /// Escrow hold status in the credit ledger.
    CreditHoldStatus {
        Frozen = 1 => "frozen",
        Settled = 2 => "settled",
    }
}

impl BatchJobStatus {
    /// Terminal statuses: completed, partial, failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Failed)
    }
}

impl VideoTaskStatus {
    /// Terminal statuses: succeeded, failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Statuses the dispatcher treats as not yet sent to the provider.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, Self::Pending | Self::Queued)
    }
}

impl From<BatchOutcome> for BatchJobStatus {
    fn from(value: BatchOutcome) -> Self {
        match value {
            BatchOutcome::Completed => Self::Completed,
            BatchOutcome::Partial => Self::Partial,
            BatchOutcome::Failed => Self::Failed,
        }
    }
}

impl From<SettlementKind> for SettlementStatus {
    fn from(value: SettlementKind) -> Self {
        match value {
            SettlementKind::Refunded => Self::Refunded,
            SettlementKind::Finalized => Self::Finalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_status_ids_match_seed_data() {
        assert_eq!(BatchJobStatus::Queued.id(), 1);
        assert_eq!(BatchJobStatus::Processing.id(), 2);
        assert_eq!(BatchJobStatus::Completed.id(), 3);
        assert_eq!(BatchJobStatus::Partial.id(), 4);
        assert_eq!(BatchJobStatus::Failed.id(), 5);
    }

    #[test]
    fn task_status_ids_match_seed_data() {
        assert_eq!(VideoTaskStatus::Pending.id(), 1);
        assert_eq!(VideoTaskStatus::Processing.id(), 2);
        assert_eq!(VideoTaskStatus::Succeeded.id(), 3);
        assert_eq!(VideoTaskStatus::Failed.id(), 4);
        assert_eq!(VideoTaskStatus::Queued.id(), 5);
    }

    #[test]
    fn settlement_status_ids_match_seed_data() {
        assert_eq!(SettlementStatus::Pending.id(), 1);
        assert_eq!(SettlementStatus::Refunded.id(), 2);
        assert_eq!(SettlementStatus::Finalized.id(), 3);
    }

    #[test]
    fn from_id_round_trips() {
        for id in 1..=5 {
            assert_eq!(VideoTaskStatus::from_id(id).unwrap().id(), id);
            assert_eq!(BatchJobStatus::from_id(id).unwrap().id(), id);
        }
        assert_eq!(VideoTaskStatus::from_id(0), None);
        assert_eq!(SettlementStatus::from_id(9), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = BatchJobStatus::Processing.into();
        assert_eq!(id, 2);
    }

    #[test]
    fn labels_match_seed_names() {
        assert_eq!(BatchJobStatus::Partial.as_str(), "partial");
        assert_eq!(VideoTaskStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(CreditHoldStatus::Settled.as_str(), "settled");
    }

    #[test]
    fn terminal_task_statuses() {
        assert!(VideoTaskStatus::Succeeded.is_terminal());
        assert!(VideoTaskStatus::Failed.is_terminal());
        assert!(!VideoTaskStatus::Processing.is_terminal());
        assert!(VideoTaskStatus::Queued.is_dispatchable());
        assert!(!VideoTaskStatus::Processing.is_dispatchable());
    }

    #[test]
    fn outcomes_map_to_batch_statuses() {
        assert_eq!(BatchJobStatus::from(BatchOutcome::Partial), BatchJobStatus::Partial);
        assert_eq!(
            SettlementStatus::from(SettlementKind::Refunded),
            SettlementStatus::Refunded
        );
        assert!(BatchJobStatus::from(BatchOutcome::Failed).is_terminal());
    }
}
