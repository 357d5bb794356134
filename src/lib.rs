//! Drag DOM elements out of a Tauri window as native drags.
//!
//! A drag either asks the app to open a new window where it lands, or hands its
//! data back to another window of the same app that listens for element drops.

mod bridge;
mod commands;
mod config;
mod drop_listener;
mod error;
mod native;
mod outcome;
mod registry;
mod session;
mod snapshot;
mod state;

pub use bridge::{NativeDragBridge, NativeDragRequest};
pub use commands::GuestCapture;
pub use config::Config;
pub use drop_listener::{DropEvent, DropHandler, DropListenerController};
pub use error::{DragError, Result};
pub use native::TauriDragBridge;
pub use outcome::{
    normalize, normalize_payload, CursorPosition, OutcomeKind, OutcomeMode, RawDragResult,
    RawOutcome, SessionOutcome,
};
pub use registry::{
    CallbackRegistry, CallbackToken, ChannelId, Handler, Lifetime, SubscriptionName,
};
pub use session::{
    DragSession, DragSessionController, OutcomeHandler, SessionId, SessionRecord, SessionState,
    SessionTable,
};
pub use snapshot::{CapturedImage, DragTarget, ElementRef, ElementResolver, Snapshotter};
pub use state::DragAsWindowState;

use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, RunEvent, Runtime, WindowEvent};

pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    #[allow(unused_mut)]
    let mut builder = Builder::<R, Option<Config>>::new("drag-as-window");

    #[cfg(feature = "global-js")]
    {
        builder = builder.js_init_script(include_str!("./api-iife.js").to_string());
    }

    builder
        .invoke_handler(tauri::generate_handler![
            commands::drag_new_window,
            commands::drag_back,
            commands::on_drop
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            log::debug!("drag-as-window config: {:?}", config);
            app.manage(DragAsWindowState::new(config));
            Ok(())
        })
        .on_event(|app, event| match event {
            RunEvent::WindowEvent {
                label,
                event: WindowEvent::Destroyed,
                ..
            } => {
                if let Some(state) = app.try_state::<DragAsWindowState>() {
                    state.teardown_window(label);
                }
                native::forget_window(label);
            }
            RunEvent::Exit => {
                if let Some(state) = app.try_state::<DragAsWindowState>() {
                    state.shutdown();
                }
            }
            _ => {}
        })
        .build()
}
