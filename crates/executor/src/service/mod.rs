//! Submission loop tying the dispatcher to its callers.
//!
//! Callers hand in a [`TaskAndCallback`]; the loop executes each operation
//! end to end on a blocking worker, delivers the typed result to the
//! task's completion callback exactly once, and forwards it as a
//! [`WireMessage`] on the outbound stream. An engine-integrity fault stops
//! the loop: the enclosing batch is aborted and queued submissions observe
//! channel closure instead of fabricated results.

use crate::executor::Dispatcher;
use crate::types::{ContractOperation, Task, TaskResult, WireMessage};
use eyre::Result;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

/// Single-shot completion notifier, invoked exactly once per dispatched
/// task.
pub type ResultCallback = oneshot::Sender<TaskResult>;

/// A task descriptor together with its operation payload and completion
/// notifier.
#[derive(Debug)]
pub struct TaskAndCallback {
    pub task: Task,
    pub operation: ContractOperation,
    pub callback: Option<ResultCallback>,
}

/// Spawn the submission loop.
///
/// Returns the loop handle, the submission sender, and the outbound
/// wire-message stream. The handle resolves with an error when a host
/// fault aborts the batch; recoverable failures never stop the loop.
pub fn spawn_service(
    dispatcher: Dispatcher,
) -> (
    JoinHandle<Result<()>>,
    UnboundedSender<TaskAndCallback>,
    impl Stream<Item = WireMessage>,
) {
    let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<TaskAndCallback>();
    let (wire_tx, wire_rx) = mpsc::unbounded_channel::<WireMessage>();
    let wire_stream = UnboundedReceiverStream::new(wire_rx);

    let jh = tokio::spawn(async move {
        while let Some(TaskAndCallback {
            task,
            operation,
            callback,
        }) = submit_rx.recv().await
        {
            tracing::trace!(task_id = task.id, "service received task");

            // The engine run is CPU-blocking by design; keep it off the
            // async workers.
            let worker = dispatcher.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let result = worker.dispatch(&task, &operation);
                (task, result)
            })
            .await;

            let (task, result) = match outcome {
                Ok(res) => res,
                Err(err) => {
                    tracing::error!("dispatch worker panicked: {err}");
                    return Err(eyre::eyre!("dispatch worker panicked: {err}"));
                }
            };

            match result {
                Ok(result) => {
                    if let Some(callback) = callback {
                        // Forget the result if the submitter went away.
                        if callback.send(result.clone()).is_err() {
                            tracing::trace!(
                                task_id = task.id,
                                "completion callback dropped before delivery"
                            );
                        }
                    }
                    let _ = wire_tx.send(result.into_wire_message());
                }
                Err(err) => {
                    // Engine integrity violated. No result record exists
                    // for this task and none of the queued work can be
                    // trusted to run; abort the batch.
                    tracing::error!(task_id = task.id, "aborting batch: {err}");
                    return Err(err.into());
                }
            }
        }
        Ok(())
    });

    (jh, submit_tx, wire_stream)
}
