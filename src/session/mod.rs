mod completion;

pub use completion::{
    CompletionEvent, CompletionState, CompletionStateMachine, EditorInput, InputDisposition,
    SubscriptionId,
};
