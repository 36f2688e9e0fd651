//! Runtime interaction/dialogue state machine for a point-and-click adventure
//! framework: the hotspot interaction dispatcher, the conversation-option
//! engine, the speech sequencer, and the frame scheduler that drives them in a
//! fixed order. Everything external (movement, sequence execution, menus,
//! audio) is reached through the provider traits in [`providers`].

pub mod caps;
pub mod context;
pub mod conversation;
pub mod hotspot;
pub mod input;
pub mod interact;
pub mod inventory;
pub mod mode;
pub mod providers;
pub mod registry;
pub mod save;
pub mod scheduler;
pub mod speech;
pub mod types;

pub use caps::SystemCaps;
pub use context::GameContext;
pub use conversation::{
    AfterOption, Conversation, ConversationOption, ConversationPhase, ConversationRuntime,
    ConversationTimeout,
};
pub use hotspot::{
    Approach, DoubleClickReaction, ExamineButton, Hotspot, InteractionKind, InventoryButton,
    SequenceSource, UseButton,
};
pub use input::{ClickKind, InputSnapshot};
pub use interact::{
    CycleBehavior, HotspotDetection, IndexRestore, InteractionConfig, InteractionMethod,
    InteractionRuntime, UnhandledTable,
};
pub use inventory::{InventoryLedger, ItemDef};
pub use mode::{GameMode, ModeState};
pub use providers::{
    AudioHandle, Gait, MenuHost, Navigator, RunHandle, SequenceEffect, SequenceRunner,
    SequenceTrigger, Services, SpeechAudio,
};
pub use registry::SceneRegistry;
pub use save::{SessionSnapshot, SnapshotError};
pub use scheduler::FrameScheduler;
pub use speech::{SpeechHandle, SpeechRequest, SpeechRuntime};
pub use types::{Pos, Rect};
