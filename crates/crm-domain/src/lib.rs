pub mod board;
pub mod contact;
pub mod deal;
pub mod drag;
pub mod field_update;
pub mod filter;
pub mod lead;
pub mod notification;
pub mod reconcile;
pub mod snapshot;
pub mod stage;
pub mod stages;
pub mod store;

pub use board::{BoardStore, ColumnSummary, StageDeals};
pub use contact::{Contact, ContactId, NewContact};
pub use deal::{Deal, DealCategory, DealId, DealStatus, DealUpdate, NewDeal};
pub use drag::{
    DragController, DragOutcome, DragSession, DragState, DropDecision, DropTarget, PendingCommit,
    Point,
};
pub use field_update::FieldUpdate;
pub use filter::{ActiveOnlyFilter, CategoryFilter, CompositeFilter, DealFilter, StageFilter};
pub use lead::{InboundLead, IngestedLead, LEAD_STAGE};
pub use notification::{Notification, NotificationCenter, NotificationId, NotificationKind};
pub use reconcile::{ReconciliationClient, StageCommitter};
pub use snapshot::PipelineSnapshot;
pub use stage::{
    default_stages, next_ordinal, slugify, Stage, StageColor, StageId, StageOrder, StageOutcome,
    StageUpdate,
};
pub use stages::StageManager;
pub use store::PipelineStore;
