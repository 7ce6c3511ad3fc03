use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::logging::TracingLogger;

const GAMEFLOW: &str = "/lol-gameflow/v1/session";

fn router() -> Arc<EventRouter> {
	Arc::new(EventRouter::new(Arc::new(TracingLogger::default())))
}

fn attached_router() -> (Arc<EventRouter>, mpsc::UnboundedReceiver<Message>) {
	let router = router();
	let (tx, rx) = mpsc::unbounded_channel();
	router.attach(tx);
	(router, rx)
}

/// Handler that forwards `(tag, event)` to a channel.
fn recorder(
	tag: &'static str,
	tx: &mpsc::UnboundedSender<(&'static str, Arc<Event>)>,
) -> impl Fn(Arc<Event>) -> HandlerFuture + Send + Sync + 'static {
	let tx = tx.clone();
	move |event: Arc<Event>| -> HandlerFuture {
		let tx = tx.clone();
		Box::pin(async move {
			let _ = tx.send((tag, event));
			anyhow::Ok(())
		})
	}
}

fn event_frame(channel: &str, event_type: &str, uri: &str) -> String {
	json!([8, channel, {"eventType": event_type, "uri": uri, "data": {"phase": "Lobby"}}]).to_string()
}

fn sent(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
	let mut out = Vec::new();
	while let Ok(msg) = rx.try_recv() {
		if let Message::Text(text) = msg {
			out.push(text);
		}
	}
	out
}

async fn recv_tags(rx: &mut mpsc::UnboundedReceiver<(&'static str, Arc<Event>)>, n: usize) -> Vec<&'static str> {
	let mut tags = Vec::new();
	for _ in 0..n {
		let (tag, _) = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
		tags.push(tag);
	}
	tags.sort_unstable();
	tags
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<(&'static str, Arc<Event>)>) {
	assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
}

#[tokio::test]
async fn subscribe_registers_topic_and_catch_all_then_sends_both() {
	let (router, mut wire) = attached_router();
	let (tx, _rx) = mpsc::unbounded_channel();

	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("a", &tx)).unwrap();

	assert_eq!(router.handler_count(GAMEFLOW), 1);
	assert_eq!(router.handler_count(CATCH_ALL_CHANNEL), 1);
	assert_eq!(sent(&mut wire), vec![r#"[5,"/lol-gameflow/v1/session"]"#, r#"[5,"OnJsonApiEvent"]"#]);
}

#[tokio::test]
async fn invalid_filter_changes_nothing() {
	let (router, mut wire) = attached_router();
	let (tx, _rx) = mpsc::unbounded_channel();

	let empty = router.subscribe(GAMEFLOW, &[], recorder("a", &tx));
	assert!(matches!(empty, Err(Error::Subscription(_))));

	let unknown = router.subscribe(GAMEFLOW, &[EventType::Update, EventType::from("Patch")], recorder("a", &tx));
	assert!(matches!(unknown, Err(Error::Subscription(_))));

	assert!(router.topics().is_empty());
	assert!(sent(&mut wire).is_empty());
}

#[tokio::test]
async fn subscribe_without_session_registers_but_reports_not_connected() {
	let router = router();
	let (tx, _rx) = mpsc::unbounded_channel();

	let result = router.subscribe(GAMEFLOW, &[EventType::Update], recorder("a", &tx));

	assert!(matches!(result, Err(Error::NotConnected)));
	assert_eq!(router.handler_count(GAMEFLOW), 1);
	assert_eq!(router.handler_count(CATCH_ALL_CHANNEL), 1);
}

#[tokio::test]
async fn unsubscribe_removes_topic_but_keeps_catch_all_entries() {
	let (router, mut wire) = attached_router();
	let (tx, _rx) = mpsc::unbounded_channel();
	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("a", &tx)).unwrap();
	sent(&mut wire);

	router.unsubscribe(GAMEFLOW).unwrap();

	assert_eq!(router.handler_count(GAMEFLOW), 0);
	assert_eq!(router.handler_count(CATCH_ALL_CHANNEL), 1);
	assert_eq!(sent(&mut wire), vec![r#"[6,"/lol-gameflow/v1/session"]"#]);
}

#[tokio::test]
async fn catch_all_event_reaches_uri_and_root_handlers() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("uri", &tx)).unwrap();
	router.subscribe_to_all(recorder("root", &tx)).unwrap();
	router.subscribe("/lol-chat/v1/me", &[EventType::Update], recorder("other", &tx)).unwrap();

	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW));

	assert_eq!(recv_tags(&mut rx, 2).await, vec!["root", "uri"]);
	assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn filter_drops_unlisted_types() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe(GAMEFLOW, &[EventType::Create], recorder("create-only", &tx)).unwrap();

	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW));
	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Refresh", GAMEFLOW));
	assert_quiet(&mut rx).await;

	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Create", GAMEFLOW));
	assert_eq!(recv_tags(&mut rx, 1).await, vec!["create-only"]);
}

#[tokio::test]
async fn named_channel_dispatches_by_channel_key() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe("OnLcdsEvent", &[EventType::Update], recorder("channel", &tx)).unwrap();
	router.subscribe_to_all(recorder("root", &tx)).unwrap();

	router.handle_text(&event_frame("OnLcdsEvent", "Update", "/whatever"));

	assert_eq!(recv_tags(&mut rx, 1).await, vec!["channel"]);
	assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn repeated_events_are_not_deduplicated() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("a", &tx)).unwrap();

	let frame = event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW);
	router.handle_text(&frame);
	router.handle_text(&frame);

	assert_eq!(recv_tags(&mut rx, 2).await, vec!["a", "a"]);
}

#[tokio::test]
async fn malformed_frames_are_dropped() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe_to_all(recorder("root", &tx)).unwrap();

	for frame in [
		"not json",
		r#"{"op": 8}"#,
		r#"[8, "OnJsonApiEvent"]"#,
		r#"[8, 7, {"eventType": "Update", "uri": "/"}]"#,
		r#"[8, "OnJsonApiEvent", "payload"]"#,
		r#"[8, "OnJsonApiEvent", {"uri": "/"}]"#,
		r#"[0, "welcome"]"#,
	] {
		router.handle_text(frame);
	}
	assert_quiet(&mut rx).await;

	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Delete", "/x"));
	assert_eq!(recv_tags(&mut rx, 1).await, vec!["root"]);
}

#[tokio::test]
async fn failing_and_panicking_handlers_do_not_affect_others() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();

	router
		.subscribe(GAMEFLOW, &[EventType::Update], |_event| async { Err::<(), _>(anyhow::anyhow!("boom")) })
		.unwrap();
	router
		.subscribe(GAMEFLOW, &[EventType::Update], |_event| async {
			if true {
				panic!("handler panic");
			}
			anyhow::Ok(())
		})
		.unwrap();
	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("ok", &tx)).unwrap();

	let frame = event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW);
	router.handle_text(&frame);
	assert_eq!(recv_tags(&mut rx, 1).await, vec!["ok"]);

	router.handle_text(&frame);
	assert_eq!(recv_tags(&mut rx, 1).await, vec!["ok"]);
}

#[tokio::test]
async fn handlers_receive_event_payload() {
	let (router, _wire) = attached_router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe(GAMEFLOW, &[EventType::Update], recorder("a", &tx)).unwrap();

	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW));

	let (_, event) = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
	assert_eq!(event.event_type, EventType::Update);
	assert_eq!(event.uri, GAMEFLOW);
	assert_eq!(event.data["phase"], "Lobby");
}

#[tokio::test]
async fn frame_tap_sees_every_array() {
	let router = router();
	let mut frames = router.frames();

	router.handle_text(r#"[0, "welcome"]"#);
	router.handle_text("garbage");
	router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Update", GAMEFLOW));

	assert_eq!(frames.recv().await.unwrap(), json!([0, "welcome"]));
	assert_eq!(frames.recv().await.unwrap()[0], 8);
	assert!(frames.try_recv().is_err());
}

#[tokio::test]
async fn detach_if_current_ignores_stale_channel() {
	let router = router();
	let (stale, _) = mpsc::unbounded_channel();
	let (current, _current_rx) = mpsc::unbounded_channel();
	router.attach(current.clone());

	router.detach_if_current(&stale);
	assert!(router.is_attached());

	router.detach_if_current(&current);
	assert!(!router.is_attached());
}

#[tokio::test]
async fn listener_feeds_router_until_read_error() {
	let router = router();
	let (tx, mut rx) = mpsc::unbounded_channel();
	router.subscribe_to_all(recorder("root", &tx)).ok();

	let frames = stream::iter(vec![
		Ok(Message::Text(event_frame(CATCH_ALL_CHANNEL, "Update", "/a"))),
		Ok(Message::Ping(Vec::new())),
		Ok(Message::Binary(event_frame(CATCH_ALL_CHANNEL, "Create", "/b").into_bytes())),
		Err(WsError::ConnectionClosed),
		Ok(Message::Text(event_frame(CATCH_ALL_CHANNEL, "Delete", "/never"))),
	]);

	let exit = listen(frames, router.clone(), CancellationToken::new()).await;

	assert!(matches!(exit, ListenerExit::Failed(_)));
	assert_eq!(recv_tags(&mut rx, 2).await, vec!["root", "root"]);
	assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn listener_stops_on_close_frame() {
	let frames = stream::iter(vec![Ok(Message::Close(None)), Ok(Message::Text("[]".to_string()))]);
	assert_eq!(listen(frames, router(), CancellationToken::new()).await, ListenerExit::Closed);

	let ended = stream::iter(Vec::<std::result::Result<Message, WsError>>::new());
	assert_eq!(listen(ended, router(), CancellationToken::new()).await, ListenerExit::Closed);
}

#[tokio::test]
async fn listener_honours_cancellation() {
	let cancel = CancellationToken::new();
	let pending = stream::pending::<std::result::Result<Message, WsError>>();
	let task = tokio::spawn(listen(pending, router(), cancel.clone()));

	cancel.cancel();
	let exit = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
	assert_eq!(exit, ListenerExit::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribe_dispatch_unsubscribe_keeps_registry_consistent() {
	const WORKERS: usize = 8;
	const ROUNDS: usize = 200;

	let (router, mut wire) = attached_router();
	let delivered = Arc::new(AtomicUsize::new(0));

	let mut workers = Vec::with_capacity(WORKERS);
	for worker in 0..WORKERS {
		let router = Arc::clone(&router);
		let delivered = Arc::clone(&delivered);
		workers.push(tokio::spawn(async move {
			let topic = format!("/lol-test/v1/worker-{worker}");
			for _ in 0..ROUNDS {
				let delivered = Arc::clone(&delivered);
				router
					.subscribe(&topic, &[EventType::Update], move |_event: Arc<Event>| {
						let delivered = Arc::clone(&delivered);
						async move {
							delivered.fetch_add(1, Ordering::SeqCst);
							anyhow::Ok(())
						}
					})
					.unwrap();
				router.handle_text(&event_frame(CATCH_ALL_CHANNEL, "Update", &topic));
				router.unsubscribe(&topic).unwrap();
			}
		}));
	}
	for worker in workers {
		worker.await.unwrap();
	}

	router.tasks().close();
	router.tasks().wait().await;

	assert_eq!(delivered.load(Ordering::SeqCst), WORKERS * ROUNDS);
	assert_eq!(router.handler_count(CATCH_ALL_CHANNEL), WORKERS * ROUNDS);
	assert_eq!(router.topics(), vec![CATCH_ALL_CHANNEL.to_string()]);
	assert_eq!(sent(&mut wire).len(), 3 * WORKERS * ROUNDS);

	for worker in 0..WORKERS {
		let topic = format!("/lol-test/v1/worker-{worker}");
		let event = Event::new(EventType::Update, topic.as_str(), json!({}));
		assert_eq!(router.dispatch(CATCH_ALL_CHANNEL, event), 0);
	}
}
