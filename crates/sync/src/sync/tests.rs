use std::sync::Arc;
use std::time::Duration;

use carmenu_protocol::payload::field;
use carmenu_protocol::{AppCategory, PayloadValue};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::Error;
use crate::config::DispatchPreference;
use crate::entry::{Icon, PassthroughIcons};
use crate::transport::sim::{RemoteCall, SimMode, SimOp, SimulatedHeadUnit};

fn entry(package: &str, name: &str, category: AppCategory) -> EntryDescriptor {
	EntryDescriptor::new(EntryIdentity::from_package("carmenu", package), name, Icon::default(), category).unwrap()
}

fn maps() -> EntryDescriptor {
	entry("org.maps", "Maps", AppCategory::Navigation)
}

fn music() -> EntryDescriptor {
	entry("org.music", "Music", AppCategory::Multimedia)
}

fn radio() -> EntryDescriptor {
	entry("org.radio", "Radio", AppCategory::Radio)
}

fn synchronizer(mode: SimMode) -> (Arc<SimulatedHeadUnit>, Synchronizer) {
	let remote = SimulatedHeadUnit::new(mode);
	let sync = Synchronizer::new(remote.clone(), Arc::new(PassthroughIcons), SyncConfig::default()).unwrap();
	(remote, sync)
}

fn shown(remote: &SimulatedHeadUnit, sync: &Synchronizer) -> Vec<String> {
	let handle = sync.active_handle().expect("active container");
	remote.entries(handle.raw()).into_iter().map(|(id, _)| id.to_string()).collect()
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl MenuEventHandler for Recorder {
	fn on_entry_selected(&self, entry: &EntryDescriptor) {
		self.0.lock().push(entry.name().to_string());
	}
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn initial_pass_creates_container_once() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);

	let report = sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	assert!(!report.rebuilt);
	assert_eq!(report.registered, 2);
	assert!(report.flush.settled);

	let handle = sync.active_handle().unwrap();
	let calls = remote.calls();
	assert_eq!(calls.len(), 4);
	assert_eq!(calls[0], RemoteCall::Create { handle: handle.raw() });
	assert_eq!(
		calls[1],
		RemoteCall::AddHandler {
			handle: handle.raw(),
			listener: "carmenu".into()
		}
	);
	assert_eq!(remote.registered(), vec![maps().identity().clone(), music().identity().clone()]);
	assert_eq!(remote.listeners(handle.raw()), vec!["carmenu".to_string()]);
	assert_eq!(sync.known_len(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn repeated_pass_is_idempotent() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	remote.clear_calls();

	let report = sync.set_desired_entries(&[music(), maps()]).await.unwrap();
	assert!(!report.rebuilt);
	assert_eq!(report.registered, 0);
	assert!(remote.calls().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn additions_register_without_rebuild() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps()]).await.unwrap();
	remote.clear_calls();

	let report = sync.set_desired_entries(&[maps(), radio()]).await.unwrap();
	assert!(!report.rebuilt);
	assert_eq!(report.registered, 1);
	assert_eq!(remote.registered(), vec![radio().identity().clone()]);
	assert_eq!(remote.create_count(), 0);
	assert_eq!(shown(&remote, &sync), vec!["carmenu.org.maps", "carmenu.org.radio"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rename_rebuilds_exactly_once() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	let before = sync.active_handle().unwrap();
	remote.clear_calls();

	let renamed = entry("org.maps", "Atlas", AppCategory::Navigation);
	let report = sync.set_desired_entries(&[renamed.clone(), music()]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(report.registered, 2);
	assert_eq!(remote.destroy_count(), 1);
	assert_eq!(remote.create_count(), 1);

	let after = sync.active_handle().unwrap();
	assert_ne!(before, after);
	assert_eq!(remote.live_containers(), vec![after.raw()]);
	assert_eq!(sync.lookup(renamed.identity()).unwrap().name(), "Atlas");

	let payloads = remote.entries(after.raw());
	assert_eq!(payloads[0].1.get(field::NAME), Some(&PayloadValue::Str("Atlas".into())));

	remote.clear_calls();
	let report = sync.set_desired_entries(&[renamed, music()]).await.unwrap();
	assert!(!report.rebuilt);
	assert!(remote.calls().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn category_change_rebuilds() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps()]).await.unwrap();

	let moved = entry("org.maps", "Maps", AppCategory::OnlineServices);
	let report = sync.set_desired_entries(&[moved]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(remote.destroy_count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn removal_rebuilds_with_remaining_entries() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music(), radio()]).await.unwrap();

	let report = sync.set_desired_entries(&[maps(), radio()]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(report.registered, 2);
	assert_eq!(sync.known_len(), 2);
	assert!(sync.lookup(music().identity()).is_none());
	assert_eq!(shown(&remote, &sync), vec!["carmenu.org.maps", "carmenu.org.radio"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn icon_change_alone_does_not_rebuild() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps()]).await.unwrap();
	remote.clear_calls();

	let repainted = EntryDescriptor::new(maps().identity().clone(), "Maps", Icon::from_bytes(vec![7, 7]), AppCategory::Navigation).unwrap();
	let report = sync.set_desired_entries(&[repainted]).await.unwrap();
	assert!(!report.rebuilt);
	assert_eq!(report.registered, 0);
	assert!(remote.calls().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn duplicate_identities_keep_first() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	let shadow = entry("org.maps", "Shadow", AppCategory::Radio);

	let report = sync.set_desired_entries(&[maps(), shadow]).await.unwrap();
	assert_eq!(report.registered, 1);
	assert_eq!(remote.registered().len(), 1);
	assert_eq!(sync.lookup(maps().identity()).unwrap().name(), "Maps");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_desired_list_clears_menu() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps()]).await.unwrap();

	let report = sync.set_desired_entries(&[]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(report.registered, 0);
	assert_eq!(sync.known_len(), 0);
	assert!(shown(&remote, &sync).is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn redraw_of_unknown_entry_is_noop() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	assert_eq!(sync.redraw(&maps()).await.unwrap(), None);

	sync.set_desired_entries(&[music()]).await.unwrap();
	remote.clear_calls();
	assert_eq!(sync.redraw(&maps()).await.unwrap(), None);
	assert!(remote.calls().is_empty());
	assert_eq!(sync.known_len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn redraw_reregisters_in_place() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	let handle = sync.active_handle().unwrap();
	remote.clear_calls();

	let repainted = EntryDescriptor::new(maps().identity().clone(), "Maps", Icon::from_bytes(vec![1, 2]), AppCategory::Navigation).unwrap();
	let flush = sync.redraw(&repainted).await.unwrap().unwrap();
	assert!(flush.settled);

	assert_eq!(remote.registered(), vec![maps().identity().clone()]);
	assert_eq!(remote.create_count(), 0);
	assert_eq!(sync.active_handle(), Some(handle));
	assert_eq!(sync.known_len(), 2);
	assert_eq!(sync.lookup(maps().identity()).unwrap().icon().bytes(), &[1, 2]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn tracked_pass_settles_before_returning() {
	let (remote, sync) = synchronizer(SimMode::AsyncAutoComplete);
	assert_eq!(sync.dispatch_mode(), DispatchMode::Tracked);

	let report = sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	assert!(report.flush.settled);
	assert_eq!(sync.pending_count(), 0);
	assert!(
		remote
			.calls()
			.iter()
			.filter(|call| matches!(call, RemoteCall::Register { .. }))
			.all(|call| matches!(call, RemoteCall::Register { blocking: false, .. }))
	);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn blocking_pass_leaves_nothing_pending() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	assert_eq!(sync.dispatch_mode(), DispatchMode::Blocking);

	let report = sync.set_desired_entries(&[maps()]).await.unwrap();
	assert_eq!(report.flush.waited, Duration::ZERO);
	assert_eq!(sync.pending_count(), 0);
	assert!(matches!(remote.calls().last(), Some(RemoteCall::Register { blocking: true, .. })));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn blocking_preference_overrides_async_transport() {
	let remote = SimulatedHeadUnit::new(SimMode::AsyncHeld);
	let config = SyncConfig {
		dispatch: DispatchPreference::Blocking,
		..SyncConfig::default()
	};
	let sync = Synchronizer::new(remote.clone(), Arc::new(PassthroughIcons), config).unwrap();

	sync.set_desired_entries(&[maps()]).await.unwrap();
	assert_eq!(sync.dispatch_mode(), DispatchMode::Blocking);
	assert_eq!(remote.held_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn flush_gives_up_at_ceiling() {
	let (remote, sync) = synchronizer(SimMode::AsyncHeld);

	let report = sync.set_desired_entries(&[maps()]).await.unwrap();
	assert!(!report.flush.settled);
	assert_eq!(report.flush.pending, 1);
	assert_eq!(report.flush.waited, Duration::from_secs(2));
	assert_eq!(sync.known_len(), 1, "registration is optimistic");

	assert_eq!(remote.release_all(), 1);
	let outcome = sync.flush().await;
	assert!(outcome.settled);
	assert_eq!(sync.pending_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn late_completion_after_rebuild_is_harmless() {
	let (remote, sync) = synchronizer(SimMode::AsyncHeld);
	sync.set_desired_entries(&[maps()]).await.unwrap();

	let renamed = entry("org.maps", "Atlas", AppCategory::Navigation);
	let report = sync.set_desired_entries(&[renamed]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(remote.held_count(), 2);
	assert_eq!(sync.pending_count(), 1);

	// Oldest held acknowledgment belongs to the destroyed container.
	assert!(remote.release(maps().identity(), Ok(())));
	let outcome = sync.flush().await;
	assert_eq!(outcome.pending, 1);

	assert!(remote.release(maps().identity(), Ok(())));
	assert!(sync.flush().await.settled);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn remote_failure_aborts_pass_without_retry() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	remote.fail_next(SimOp::Register);

	let err = sync.set_desired_entries(&[maps(), music()]).await.unwrap_err();
	assert!(matches!(err, Error::Transport { op: "register_entry", .. }));
	assert_eq!(sync.known_len(), 0);
	assert!(remote.registered().is_empty());
	assert!(sync.active_handle().is_some());

	let report = sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	assert!(!report.rebuilt);
	assert_eq!(report.registered, 2);
	assert_eq!(remote.create_count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_create_recovers_on_next_pass() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	remote.fail_next(SimOp::Create);

	assert!(sync.set_desired_entries(&[maps()]).await.is_err());
	assert_eq!(sync.active_handle(), None);

	sync.set_desired_entries(&[maps()]).await.unwrap();
	assert_eq!(sync.active_handle().unwrap().generation(), 1);
	assert_eq!(sync.known_len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_destroy_during_rebuild_rebuilds_on_next_pass() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	let old = sync.active_handle().unwrap();

	remote.fail_next(SimOp::Destroy);
	assert!(sync.set_desired_entries(&[maps()]).await.is_err());
	assert_eq!(sync.active_handle(), None);
	assert_eq!(sync.known_len(), 0);
	assert_eq!(remote.live_containers(), vec![old.raw()]);

	let report = sync.set_desired_entries(&[maps()]).await.unwrap();
	assert!(report.rebuilt);
	assert_eq!(report.registered, 1);
	let new = sync.active_handle().unwrap();
	assert_eq!(remote.live_containers(), vec![new.raw()]);
	assert_eq!(shown(&remote, &sync), vec!["carmenu.org.maps"]);
	assert_eq!(remote.listeners(new.raw()), vec!["carmenu".to_string()]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_detach_during_rebuild_keeps_known_entries() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	let old = sync.active_handle().unwrap();

	remote.fail_next(SimOp::RemoveHandler);
	assert!(sync.set_desired_entries(&[maps()]).await.is_err());
	assert_eq!(sync.active_handle(), Some(old));
	assert_eq!(sync.known_len(), 2, "old container still shows both entries");
	assert_eq!(remote.listeners(old.raw()), vec!["carmenu".to_string()]);

	let report = sync.set_desired_entries(&[maps()]).await.unwrap();
	assert!(report.rebuilt);
	let new = sync.active_handle().unwrap();
	assert_ne!(new, old);
	assert_eq!(remote.live_containers(), vec![new.raw()]);
	assert_eq!(shown(&remote, &sync), vec!["carmenu.org.maps"]);
	assert_eq!(remote.listeners(new.raw()), vec!["carmenu".to_string()]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_create_during_rebuild_reregisters_everything() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();

	remote.fail_next(SimOp::Create);
	assert!(sync.set_desired_entries(&[maps()]).await.is_err());
	assert!(remote.live_containers().is_empty());
	assert_eq!(sync.known_len(), 0);

	let report = sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	assert_eq!(report.registered, 2);
	assert_eq!(shown(&remote, &sync), vec!["carmenu.org.maps", "carmenu.org.music"]);
}

#[test]
fn rejects_invalid_config() {
	let remote = SimulatedHeadUnit::new(SimMode::BlockingOnly);
	let config = SyncConfig {
		flush_poll_ms: 0,
		..SyncConfig::default()
	};
	let err = Synchronizer::new(remote, Arc::new(PassthroughIcons), config).unwrap_err();
	assert!(matches!(err, Error::Config(_)));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn events_resolve_only_on_active_container() {
	let (_remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps(), music()]).await.unwrap();
	let old = sync.active_handle().unwrap();

	sync.set_desired_entries(&[music()]).await.unwrap();
	let new = sync.active_handle().unwrap();

	let recorder = Recorder::default();
	let stale = MenuEvent {
		handle: old.raw(),
		identity: music().identity().clone(),
	};
	let current = MenuEvent {
		handle: new.raw(),
		identity: music().identity().clone(),
	};
	let removed = MenuEvent {
		handle: new.raw(),
		identity: maps().identity().clone(),
	};

	assert!(!sync.dispatch_event(&stale, &recorder));
	assert!(!sync.dispatch_event(&removed, &recorder));
	assert!(sync.dispatch_event(&current, &recorder));
	assert_eq!(*recorder.0.lock(), vec!["Music".to_string()]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shutdown_disposes_container() {
	let (remote, sync) = synchronizer(SimMode::BlockingOnly);
	sync.set_desired_entries(&[maps()]).await.unwrap();
	let handle = sync.active_handle().unwrap();

	sync.shutdown().await.unwrap();
	assert_eq!(sync.active_handle(), None);
	assert_eq!(sync.known_len(), 0);
	assert!(remote.live_containers().is_empty());
	assert!(
		sync.resolve_event(&MenuEvent {
			handle: handle.raw(),
			identity: maps().identity().clone(),
		})
		.is_none()
	);

	sync.set_desired_entries(&[maps()]).await.unwrap();
	assert_eq!(sync.active_handle().unwrap().generation(), 2);
}

#[tokio::test]
async fn concurrent_passes_are_serialized() {
	let (remote, sync) = synchronizer(SimMode::AsyncAutoComplete);
	let sync = Arc::new(sync);

	let first = {
		let sync = sync.clone();
		tokio::spawn(async move { sync.set_desired_entries(&[maps(), music()]).await })
	};
	let second = {
		let sync = sync.clone();
		tokio::spawn(async move { sync.set_desired_entries(&[maps(), music()]).await })
	};
	let a = first.await.unwrap().unwrap();
	let b = second.await.unwrap().unwrap();

	assert_eq!(a.registered + b.registered, 2);
	assert_eq!(remote.create_count(), 1);
	assert_eq!(remote.registered().len(), 2);
}
