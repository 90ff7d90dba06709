//! Focus loss and pointer leave
//!
//! Both notify right away and cancel whatever the debounce stages had
//! pending, so nothing fires twice.

use crate::common::{ms, Call, Page, Recorder};
use idlewatch::WatcherConfig;
use idlewatch_core::EventKind;

#[test]
fn mouse_leave_fires_immediately_and_cancels_pending() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watch_form(50, 100);
    watcher.register(recorder.callback());

    page.at(0).click(page.editor);
    page.at(60);
    assert!(watcher.has_pending());

    page.fire(page.form, EventKind::PointerLeave);
    assert_eq!(
        recorder.calls(),
        vec![Call { at: ms(60), event: Some(EventKind::PointerLeave) }]
    );
    assert!(!watcher.has_pending());

    page.at(5000);
    assert_eq!(recorder.count(), 1, "pending idle timer fired after mouse leave");
}

#[test]
fn mouse_leave_while_pulse_pending_does_not_double_fire() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watch_form(50, 100).register(recorder.callback());

    page.at(0).click(page.editor);
    page.at(10).fire(page.form, EventKind::PointerLeave);
    page.at(5000);

    assert_eq!(recorder.times(), vec![ms(10)]);
}

#[test]
fn mouse_leave_from_descendant_is_not_a_leave() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watch_form(50, 100).register(recorder.callback());

    // mouseleave does not bubble: leaving the button stays inside the form
    page.fire(page.send, EventKind::PointerLeave);
    assert_eq!(recorder.count(), 0);
}

#[test]
fn mouse_leave_can_be_disabled() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watcher(WatcherConfig::for_selector("#compose").notify_on_mouse_leave(false))
        .register(recorder.callback());

    page.fire(page.form, EventKind::PointerLeave);
    page.at(100);
    assert_eq!(recorder.count(), 0);
}

#[test]
fn focus_leaving_target_fires_without_event() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    let watcher = page.watcher(
        WatcherConfig::for_selector("#compose")
            .notify_on_focus_loss(true)
            .event_debounce(ms(50))
            .callback_debounce(ms(100)),
    );
    watcher.register(recorder.callback());

    page.at(0).click(page.editor);
    page.doc.focus(page.editor).unwrap();
    page.doc.focus(page.send).unwrap();
    assert_eq!(recorder.count(), 0, "focus moved within the target");

    page.at(20);
    page.doc.focus(page.search).unwrap();
    assert_eq!(recorder.calls(), vec![Call { at: ms(20), event: None }]);
    assert!(!watcher.has_pending());

    page.at(5000);
    assert_eq!(recorder.count(), 1);
}

#[test]
fn focus_on_target_itself_is_not_a_loss() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watcher(WatcherConfig::for_selector("#editor").notify_on_focus_loss(true))
        .register(recorder.callback());

    page.doc.focus(page.editor).unwrap();
    assert_eq!(recorder.count(), 0);
    page.doc.focus(page.form).unwrap();
    assert_eq!(recorder.count(), 1);
}

#[test]
fn refocusing_outside_element_notifies_once() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watcher(WatcherConfig::for_selector("#compose").notify_on_focus_loss(true))
        .register(recorder.callback());

    page.doc.focus(page.search).unwrap();
    page.doc.focus(page.search).unwrap();
    assert_eq!(recorder.count(), 1);
}

#[test]
fn focus_loss_is_off_by_default() {
    let page = Page::new();
    let recorder = Recorder::new(&page.clock);
    page.watch_form(50, 100).register(recorder.callback());

    page.doc.focus(page.search).unwrap();
    assert_eq!(recorder.count(), 0);
}
