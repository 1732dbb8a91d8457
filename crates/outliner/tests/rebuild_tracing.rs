//! The rebuild span and the warnings for domain inconsistencies.

use std::sync::{Arc, Mutex};

use outliner::{ChildEntry, MemoryGraph, Outliner};
use outliner_core::{DomainKind, FilterFlags, ObjectKind, ViewSettings};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Default)]
struct RebuildTraceState {
    rebuild_spans: usize,
    has_mode_field: bool,
    recorded: Vec<String>,
    warnings: Vec<String>,
    toggle_events: usize,
}

struct RebuildTraceCapture {
    state: Arc<Mutex<RebuildTraceState>>,
}

impl<S> Layer<S> for RebuildTraceCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        if attrs.metadata().name() != "outliner.rebuild" {
            return;
        }
        let mut state = self.state.lock().expect("rebuild trace state lock");
        state.rebuild_spans += 1;
        state.has_mode_field |= attrs.metadata().fields().field("mode").is_some();
    }

    fn on_record(
        &self,
        id: &tracing::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if span.metadata().name() != "outliner.rebuild" {
            return;
        }

        struct FieldNames(Vec<String>);
        impl tracing::field::Visit for FieldNames {
            fn record_u64(&mut self, field: &tracing::field::Field, _value: u64) {
                self.0.push(field.name().to_owned());
            }

            fn record_debug(&mut self, field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {
                self.0.push(field.name().to_owned());
            }
        }

        let mut names = FieldNames(Vec::new());
        values.record(&mut names);
        self.state
            .lock()
            .expect("rebuild trace state lock")
            .recorded
            .extend(names.0);
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        struct MessageVisitor {
            message: Option<String>,
        }
        impl tracing::field::Visit for MessageVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = Some(value.to_owned());
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = Some(format!("{value:?}").trim_matches('"').to_owned());
                }
            }
        }

        let mut visitor = MessageVisitor { message: None };
        event.record(&mut visitor);
        let mut state = self.state.lock().expect("rebuild trace state lock");
        if *event.metadata().level() == tracing::Level::WARN {
            state.warnings.push(event.metadata().target().to_owned());
        }
        if visitor.message.as_deref() == Some("outliner.toggle") {
            state.toggle_events += 1;
        }
    }
}

fn capture<R>(run: impl FnOnce() -> R) -> (R, RebuildTraceState) {
    let state = Arc::new(Mutex::new(RebuildTraceState::default()));
    let subscriber = tracing_subscriber::registry().with(RebuildTraceCapture {
        state: Arc::clone(&state),
    });
    let result = {
        let _guard = tracing::subscriber::set_default(subscriber);
        tracing::callsite::rebuild_interest_cache();
        run()
    };
    let state = std::mem::take(&mut *state.lock().expect("rebuild trace state lock"));
    (result, state)
}

#[test]
fn rebuild_span_records_its_counters() {
    let mut graph = MemoryGraph::new();
    let (_, master) = graph.add_scene("Scene");
    let props = graph.add_collection("Props", master);
    graph.add_object("Table", ObjectKind::Mesh, props);

    let (_, state) = capture(|| {
        let mut outliner = Outliner::default();
        outliner.rebuild(&graph, true);
        let props = outliner
            .tree()
            .find(|node| node.name() == "Props")
            .expect("props node");
        outliner.toggle_open(&graph, props);
        // Clean and not forced: no span.
        outliner.rebuild(&graph, false);
    });

    assert_eq!(state.rebuild_spans, 1);
    assert!(state.has_mode_field, "outliner.rebuild missing mode");
    for field in ["node_count", "records", "swept", "duration_us"] {
        assert!(
            state.recorded.iter().any(|name| name == field),
            "outliner.rebuild did not record {field}"
        );
    }
    assert_eq!(state.toggle_events, 1);
    assert!(state.warnings.is_empty(), "{:?}", state.warnings);
}

#[test]
fn missing_child_and_parent_cycle_warn() {
    let mut graph = MemoryGraph::new();
    let (_, master) = graph.add_scene("Scene");
    let a = graph.add_object("A", ObjectKind::Empty, master);
    let b = graph.add_object("B", ObjectKind::Empty, master);
    graph.set_parent(a, Some(b));
    graph.set_parent(b, Some(a));
    let ghost = graph.add(DomainKind::Mesh, "Ghost");
    graph.add_component(a, ChildEntry::object(ghost));
    graph.remove(ghost);

    let (report, state) = capture(|| {
        let mut outliner =
            Outliner::new(ViewSettings::default().with_filter(FilterFlags::NO_COLLECTION));
        let report = outliner.rebuild(&graph, true);
        assert_eq!(outliner.tree().outline(), "B\n  A\n");
        report
    });

    assert_eq!(report.skipped, 1);
    assert_eq!(report.cycles, 1);
    assert!(state.warnings.iter().any(|target| target == "outliner.build"));
    assert!(state.warnings.iter().any(|target| target == "outliner.link"));
}
