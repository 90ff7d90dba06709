//! Release and automatic teardown

use crate::common::{ms, Page, Recorder};
use idlewatch::{watch, WatcherConfig};
use idlewatch_core::EventKind;

#[test]
fn removal_from_parent_releases_watcher() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watch_form(0, 100);
    watcher.register(recorder.callback());

    page.doc.remove_child(page.main, page.form).unwrap();
    assert!(watcher.is_released());
    assert_eq!(page.doc.listener_count(), 0);
    assert_eq!(page.doc.observer_count(), 0);

    // The detached subtree still dispatches, but nobody listens
    page.click(page.editor);
    page.fire(page.form, EventKind::PointerLeave);
    page.at(1000);
    assert_eq!(recorder.count(), 0);
}

#[test]
fn removal_cancels_pending_idle_timer() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watch_form(50, 100).register(recorder.callback());

    page.at(0).click(page.editor);
    page.at(70);
    page.doc.remove_child(page.main, page.form).unwrap();
    page.at(1000);

    assert_eq!(recorder.count(), 0);
    assert_eq!(page.clock.pending_timers(), 0);
}

#[test]
fn moving_target_elsewhere_counts_as_removal() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watch_form(0, 100);
    watcher.register(recorder.callback());

    page.doc.append_child(page.doc.root(), page.form).unwrap();
    assert!(watcher.is_released());
}

#[test]
fn sibling_removal_keeps_watching() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watch_form(0, 100);
    watcher.register(recorder.callback());

    page.doc.remove_child(page.form, page.send).unwrap();
    assert!(!watcher.is_released());

    page.click(page.editor);
    page.at(100);
    assert_eq!(recorder.count(), 1);
}

#[test]
fn ancestor_removal_is_not_observed() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watch_form(0, 100);
    watcher.register(recorder.callback());

    // Only the direct parent is observed
    page.doc.remove_child(page.doc.root(), page.main).unwrap();
    assert!(!watcher.is_released());

    page.click(page.editor);
    page.at(100);
    assert_eq!(recorder.count(), 1);

    watcher.release();
    assert_eq!(page.doc.listener_count(), 0);
    assert_eq!(page.doc.observer_count(), 0);
}

#[test]
fn released_watcher_ignores_all_triggers() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watcher(
        WatcherConfig::for_selector("#compose")
            .notify_on_focus_loss(true)
            .event_debounce(ms(0))
            .callback_debounce(ms(100)),
    );
    watcher.register(recorder.callback());
    watcher.release();

    page.click(page.editor);
    page.fire(page.editor, EventKind::KeyDown);
    page.doc.focus(page.search).unwrap();
    page.fire(page.form, EventKind::PointerLeave);
    page.at(1000);

    assert_eq!(recorder.count(), 0);
    assert_eq!(page.clock.pending_timers(), 0);
}

#[test]
fn watch_keeps_running_without_a_handle() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    drop(
        watch(
            WatcherConfig::for_selector("#editor")
                .event_debounce(ms(0))
                .callback_debounce(ms(100)),
            page.host.clone(),
            recorder.callback(),
        )
        .unwrap(),
    );

    page.fire(page.editor, EventKind::Change);
    page.at(100);
    assert_eq!(recorder.count(), 1);

    // Removal still tears it down
    page.doc.remove_child(page.form, page.editor).unwrap();
    assert_eq!(page.doc.listener_count(), 0);
}

#[test]
fn selector_can_go_stale_without_release() {
    let page = Page::new();
    let watcher = page.watcher(WatcherConfig::for_selector("#compose"));
    assert!(watcher.selector_matches());

    page.doc.set_id(page.form, "renamed").unwrap();
    assert!(!watcher.selector_matches());
    assert!(!watcher.is_released());
}
