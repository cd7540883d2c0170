//! End-to-end owner lifecycle scenarios.
//!
//! A coordinator owns screens; each screen owns a lifecycle and observes its
//! view model. Closing a screen must silence every observer it registered,
//! whichever container they were registered on.

use std::sync::Arc;
use std::thread;

use lifebind_core::{Lifecycle, LifecycleOwner, StateValue};
use lifebind_runtime::{
    ContainerOptions, FutureEvent, LiveData, LiveOptionalData, LiveStateData, MainQueue, Marshal,
    MediatorLiveData, Observable, SingleEvent,
};
use parking_lot::Mutex;

type Face = String;

struct SelectionModel {
    faces: LiveOptionalData<Vec<Face>>,
    load: LiveStateData<usize, String>,
}

impl SelectionModel {
    fn new() -> Self {
        Self {
            faces: LiveData::empty(),
            load: LiveData::new(StateValue::Success(0)),
        }
    }

    fn fetch(&self, faces: &[&str]) {
        self.faces
            .set(Some(faces.iter().map(|f| f.to_string()).collect()));
        self.load.set(StateValue::Success(faces.len()));
    }

    fn fail(&self, reason: &str) {
        self.load.set(StateValue::Failure(reason.to_string()));
    }
}

struct SelectionScreen {
    lifecycle: Lifecycle,
    selected: FutureEvent<Face>,
    close: SingleEvent,
    rendered: Arc<Mutex<Vec<usize>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl LifecycleOwner for SelectionScreen {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl SelectionScreen {
    fn bind(model: &SelectionModel) -> Self {
        let screen = Self {
            lifecycle: Lifecycle::labeled("selection"),
            selected: FutureEvent::new(),
            close: SingleEvent::new(),
            rendered: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
        };
        let rendered = Arc::clone(&screen.rendered);
        model
            .faces
            .observe(&screen, move |faces: &Option<Vec<Face>>| {
                rendered.lock().push(faces.as_ref().map_or(0, Vec::len));
            })
            .unwrap();
        let errors = Arc::clone(&screen.errors);
        model
            .load
            .observe(&screen, move |state: &StateValue<usize, String>| {
                if let Some(err) = state.failure() {
                    errors.lock().push(err.clone());
                }
            })
            .unwrap();
        screen
    }
}

#[test]
fn closing_a_screen_silences_its_observers() {
    let model = SelectionModel::new();
    let screen = SelectionScreen::bind(&model);
    let rendered = Arc::clone(&screen.rendered);
    let errors = Arc::clone(&screen.errors);

    model.fetch(&["cislo", "hudys", "jakub"]);
    model.fail("timeout");
    assert_eq!(*rendered.lock(), vec![3]);
    assert_eq!(*errors.lock(), vec!["timeout".to_string()]);

    drop(screen);
    assert_eq!(model.faces.observer_count(), 0);
    assert_eq!(model.load.observer_count(), 0);

    model.fetch(&["kien"]);
    model.fail("offline");
    assert_eq!(*rendered.lock(), vec![3]);
    assert_eq!(errors.lock().len(), 1);
}

#[test]
fn coordinator_follows_screen_events() {
    let coordinator = Lifecycle::labeled("coordinator");
    let model = SelectionModel::new();
    let screen = SelectionScreen::bind(&model);
    let shown = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(Mutex::new(0));

    let sink = Arc::clone(&shown);
    screen
        .selected
        .observe(&coordinator, move |face: &Face| sink.lock().push(face.clone()))
        .unwrap();
    let count = Arc::clone(&closed);
    screen
        .close
        .observe(&coordinator, move |()| *count.lock() += 1)
        .unwrap();

    screen.selected.trigger("jirka".into());
    screen.selected.trigger("petr".into());
    assert_eq!(screen.close.fire(), Ok(1));
    assert!(screen.close.fire().is_err());

    assert_eq!(*shown.lock(), vec!["jirka".to_string(), "petr".to_string()]);
    assert_eq!(*closed.lock(), 1);

    coordinator.destroy();
    assert_eq!(screen.selected.trigger("mirek".into()), 0);
    assert_eq!(shown.lock().len(), 2);
}

#[test]
fn destroying_owner_of_many_observers() {
    let live = LiveData::new(0u32);
    let owner = Arc::new(Lifecycle::new());
    let calls = Arc::new(Mutex::new(0u32));
    for _ in 0..1000 {
        let calls = Arc::clone(&calls);
        live.observe(&owner, move |_| *calls.lock() += 1).unwrap();
    }
    assert_eq!(owner.hook_count(), 1000);

    live.set(1);
    assert_eq!(*calls.lock(), 1000);

    drop(owner);
    assert_eq!(live.observer_count(), 0);
    assert_eq!(live.set(2), 0);
    assert_eq!(*calls.lock(), 1000);
}

#[test]
fn owner_destroyed_from_another_thread() {
    let live = LiveData::new(0u32);
    let owner = Lifecycle::new();
    let calls = Arc::new(Mutex::new(0u32));
    let c = Arc::clone(&calls);
    live.observe(&owner, move |_| *c.lock() += 1).unwrap();

    thread::spawn(move || owner.destroy()).join().unwrap();
    live.set(1);
    assert_eq!(*calls.lock(), 0);
    assert_eq!(live.observer_count(), 0);
}

#[test]
fn mediator_merges_model_streams() {
    let local = LiveData::new(0i32);
    let remote = LiveData::new(0i32);
    let merged = MediatorLiveData::new(0);
    merged.add_source(&local).unwrap();
    merged.add_source(&remote).unwrap();

    let screen = Lifecycle::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    merged.observe(&screen, move |v: &i32| sink.lock().push(*v)).unwrap();

    local.set(1);
    remote.set(10);
    screen.destroy();
    local.set(2);

    assert_eq!(*seen.lock(), vec![1, 10]);
    assert_eq!(merged.get(), 2);
}

#[test]
fn queue_marshal_from_many_threads() {
    let queue = MainQueue::spawn("main").unwrap();
    let options = ContainerOptions::new().with_marshal(Marshal::Queue(queue.clone()));
    let live = LiveData::with_options(0u32, options);
    let threads = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&threads);
    live.observe_forever(move |_| sink.lock().push(thread::current().name().map(str::to_owned)))
        .unwrap();

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let live = live.clone();
            thread::spawn(move || live.set(i))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(live.version(), 5);
    let threads = threads.lock();
    assert_eq!(threads.len(), 4);
    assert!(threads.iter().all(|name| name.as_deref() == Some("main")));
    drop(threads);
    queue.shutdown();
}
