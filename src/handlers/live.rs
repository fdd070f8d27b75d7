//! Server-sent event streams fed by refresh controllers.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde::Serialize;

use crate::refresh::{Phase, RefreshController};

/// Stream every settled snapshot of `controller` as a `snapshot` event.
///
/// The stream owns the controller; when the client disconnects the
/// controller is dropped and its subscription goes with it.
pub fn snapshot_stream<S, T>(
    controller: RefreshController<S, T>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Serialize + Send + Sync + 'static,
{
    let mut states = controller.watch();
    // Deliver the current state even if it settled before we subscribed
    states.mark_changed();

    let events = stream::unfold((controller, states), |(controller, mut states)| async move {
        loop {
            if states.changed().await.is_err() {
                return None;
            }
            let state = states.borrow_and_update().clone();
            match state.phase {
                Phase::TornDown => return None,
                Phase::Ready => {
                    let event = Event::default()
                        .event("snapshot")
                        .id(state.epoch.to_string())
                        .json_data(&state.data);
                    return Some((event, (controller, states)));
                }
                Phase::Idle | Phase::Loading => continue,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
