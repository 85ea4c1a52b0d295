use grblstream_communication::{GrblController, LoopbackTransport};
use grblstream_core::{ControllerEvent, EventDispatcher};
use std::sync::Arc;

#[tokio::test]
async fn test_event_dispatcher_relays_a_whole_job() {
    let transport = LoopbackTransport::new();
    let device = transport.handle();
    let controller = GrblController::new(Box::new(transport));
    let dispatcher = Arc::new(EventDispatcher::default());
    let mut rx = dispatcher.subscribe();
    controller.add_listener(dispatcher.clone());

    controller.open_comm_port("loop", 115200).unwrap();
    controller.enqueue("G0 X1");
    controller.begin_streaming().unwrap();
    device.pump(&controller);

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            ControllerEvent::CommandQueued(_) => kinds.push("queued"),
            ControllerEvent::CommandSent(_) => kinds.push("sent"),
            ControllerEvent::CommandCompleted(cmd) => {
                assert_eq!(cmd.response(), Some("ok"));
                kinds.push("completed");
            }
            ControllerEvent::StreamComplete { filename, success } => {
                assert_eq!(filename, None);
                assert!(success);
                kinds.push("complete");
            }
            _ => {}
        }
    }
    assert_eq!(kinds, vec!["queued", "sent", "completed", "complete"]);
}
