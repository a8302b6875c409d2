// src/pipeline/assembler.rs
use super::config::{DocumentConfig, FooterLayout, OutputStrategy};
use super::destination::{Destination, Sink};
use super::source::{IteratorItemSource, ItemSource, ReaderItemSource, VecItemSource};
use super::two_pass::Stamper;
use crate::cache::{CacheStats, ContentCache};
use crate::compiler::{Compiler, RendererKind};
use crate::error::PipelineError;
use crate::markup::{leaf_text, tag_of, Tag};
use crate::resource::FilesystemResourceProvider;
use serde_json::{json, Value};
use sheaf_model::SharedData;
use sheaf_render_lopdf::LopdfEngine;
use sheaf_style::{strip_keyword, Font, StyleContext};
use sheaf_traits::{DocumentEngine, ElementRenderer, PageEvent, ResourceProvider, TextMeasure};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

/// Creates a fresh engine for every build.
pub type EngineFactory = Box<dyn Fn() -> Box<dyn DocumentEngine>>;

/// Leading of the paragraph a top-level table is wrapped in.
const TABLE_WRAP_LEADING: f32 = 20.0;

/// What a finished build produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildSummary {
    pub pages: u32,
    pub strategy: OutputStrategy,
    pub cache: CacheStats,
}

/// Assembles documents: sets up the engine from the document metadata, feeds
/// it compiled top-level items, and writes the result to a [`Destination`].
///
/// An assembler holds only programmatic options (renderers, resources, page
/// events) and can run any number of builds; nothing compiled in one build is
/// visible to the next.
pub struct Assembler {
    engine_factory: EngineFactory,
    renderers: HashMap<RendererKind, Arc<dyn ElementRenderer>>,
    resources: Arc<dyn ResourceProvider>,
    bitmaps: HashMap<String, SharedData>,
    page_events: HashMap<String, Arc<dyn PageEvent>>,
    page_stamps: Vec<Arc<dyn PageEvent>>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            engine_factory: Box::new(|| Box::new(LopdfEngine::new())),
            renderers: HashMap::new(),
            resources: Arc::new(FilesystemResourceProvider::current_dir()),
            bitmaps: HashMap::new(),
            page_events: HashMap::new(),
            page_stamps: Vec::new(),
        }
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the bundled lopdf engine.
    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = factory;
        self
    }

    pub fn with_renderer(mut self, kind: RendererKind, renderer: Arc<dyn ElementRenderer>) -> Self {
        self.renderers.insert(kind, renderer);
        self
    }

    /// Where image paths are loaded from. Defaults to the working directory.
    ///
    /// The default provider only reads local files and rejects `scheme://`
    /// sources; install a provider that fetches URLs to use remote images.
    pub fn with_resource_provider(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    /// Registers image bytes addressable with the `handle` image attribute.
    pub fn with_bitmap(mut self, handle: impl Into<String>, data: Vec<u8>) -> Self {
        self.bitmaps.insert(handle.into(), Arc::new(data));
        self
    }

    /// Registers a page event under `name`; documents enable it by listing the
    /// name in their `page-events` metadata.
    pub fn with_page_event(mut self, name: impl Into<String>, event: Arc<dyn PageEvent>) -> Self {
        self.page_events.insert(name.into(), event);
        self
    }

    /// Adds a hook run on every page once the page total is known. Any hook
    /// switches builds to buffered output.
    pub fn with_page_stamp(mut self, stamp: Arc<dyn PageEvent>) -> Self {
        self.page_stamps.push(stamp);
        self
    }

    /// Builds a materialized document: an array whose first element may be
    /// the metadata map.
    pub fn build(&self, document: &Value, destination: Destination<'_>) -> Result<BuildSummary, PipelineError> {
        let items = document
            .as_array()
            .ok_or_else(|| PipelineError::Config(format!("a document must be an array, got {}", document)))?;
        let (config, body) = match items.split_first() {
            Some((first, rest)) if first.is_object() => (DocumentConfig::from_value(first)?, rest),
            _ => (DocumentConfig::default(), items.as_slice()),
        };
        let mut source = VecItemSource::new(body.to_vec());
        self.run(&config, &mut source, destination)
    }

    /// Builds from items pulled one at a time from `items`.
    pub fn build_items<I>(
        &self,
        config: &DocumentConfig,
        items: I,
        destination: Destination<'_>,
    ) -> Result<BuildSummary, PipelineError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut source = IteratorItemSource::new(items.into_iter());
        self.run(config, &mut source, destination)
    }

    /// Builds from a stream of JSON forms. The first form is the metadata map;
    /// when it is anything else it is treated as the first item.
    pub fn build_from_reader<R: Read>(&self, reader: R, destination: Destination<'_>) -> Result<BuildSummary, PipelineError> {
        let mut forms = ReaderItemSource::new(reader);
        match forms.next_item()? {
            Some(first) if first.is_object() => {
                let config = DocumentConfig::from_value(&first)?;
                self.run(&config, &mut forms, destination)
            }
            first => {
                let mut source = Prepended { first, rest: forms };
                self.run(&DocumentConfig::default(), &mut source, destination)
            }
        }
    }

    /// Runs one build from any item source.
    pub fn run(
        &self,
        config: &DocumentConfig,
        source: &mut dyn ItemSource,
        destination: Destination<'_>,
    ) -> Result<BuildSummary, PipelineError> {
        let strategy = OutputStrategy::resolve(config, self.page_stamps.len());
        log::info!("Starting build ({:?}) to {:?}", strategy, destination);
        match source.size_hint() {
            Some(items) => log::debug!("Source holds {} items", items),
            None => log::debug!("Source is streamed; item count unknown"),
        }

        let mut sink = destination.open()?;
        let result = self.assemble(config, strategy, source, &mut sink);
        // Flush whatever reached the sink before surfacing a failure.
        let flushed = sink.flush();
        let summary = result?;
        flushed?;
        log::info!(
            "Finished build: {} pages, cache {} hits / {} misses",
            summary.pages,
            summary.cache.hits,
            summary.cache.misses
        );
        Ok(summary)
    }

    fn assemble(
        &self,
        config: &DocumentConfig,
        strategy: OutputStrategy,
        source: &mut dyn ItemSource,
        sink: &mut Sink<'_>,
    ) -> Result<BuildSummary, PipelineError> {
        if config.register_system_fonts {
            crate::fonts::register_system_fonts();
        }

        let geometry = config.geometry();
        let footer = config.footer.layout();
        let mut engine = (self.engine_factory)();
        engine.set_geometry(geometry);
        engine.set_info(config.info());
        // The stamping pass owns the footer only when it prints the page total.
        let stamped_footer = strategy == OutputStrategy::BufferThenStamp && config.pages;
        engine.set_footer(if stamped_footer {
            None
        } else {
            footer.as_ref().map(FooterLayout::running_footer)
        });
        for name in &config.page_events {
            let event = self
                .page_events
                .get(strip_keyword(name))
                .ok_or_else(|| PipelineError::Config(format!("no page event registered as '{}'", name)))?;
            engine.add_page_event(Arc::clone(event));
        }

        let cache = ContentCache::new();
        let compiler = Compiler::new(&cache, self.resources.as_ref())
            .with_stylesheet(config.stylesheet.clone())
            .with_references(config.references.clone())
            .with_renderers(self.renderers.clone())
            .with_bitmaps(self.bitmaps.clone());
        let ambient = config.ambient_context(&geometry);

        engine.open()?;
        for item in &config.letterhead {
            append(engine.as_mut(), &compiler, item, &ambient)?;
        }
        engine.set_header(config.header.clone());

        let mut count = 0usize;
        while let Some(item) = source.next_item()? {
            count += 1;
            log::debug!("Appending item {}", count);
            append(engine.as_mut(), &compiler, &item, &ambient)?;
        }

        let pages = match strategy {
            OutputStrategy::DirectWrite => engine.close(sink)?,
            OutputStrategy::BufferThenStamp => {
                let mut buffer = Vec::new();
                engine.close(&mut buffer)?;
                log::debug!("First pass produced {} bytes", buffer.len());
                let stamper = Stamper {
                    footer: footer.as_ref().filter(|_| stamped_footer),
                    stamps: &self.page_stamps,
                    measure: &EngineMetrics(engine.as_ref()),
                };
                stamper.finish(&buffer, sink)?
            }
        };

        Ok(BuildSummary {
            pages,
            strategy,
            cache: cache.stats(),
        })
    }
}

/// One top-level item: groups are opened one level, the rest is preprocessed
/// and handed to the engine.
fn append(
    engine: &mut dyn DocumentEngine,
    compiler: &Compiler<'_>,
    item: &Value,
    context: &StyleContext,
) -> Result<(), PipelineError> {
    match item {
        Value::Array(group) if group.first().is_some_and(Value::is_array) => {
            for inner in group {
                append_single(engine, compiler, inner, context)?;
            }
            Ok(())
        }
        _ => append_single(engine, compiler, item, context),
    }
}

fn append_single(
    engine: &mut dyn DocumentEngine,
    compiler: &Compiler<'_>,
    item: &Value,
    context: &StyleContext,
) -> Result<(), PipelineError> {
    match tag_of(item) {
        Some(Tag::PageBreak) => {
            engine.new_page()?;
            return Ok(());
        }
        Some(Tag::ClearDoublePage) => {
            engine.new_page()?;
            if engine.page_number() % 2 == 0 {
                let blank = compiler.compile(&json!(["spacer"]), context)?;
                engine.add(&blank)?;
                engine.new_page()?;
            }
            return Ok(());
        }
        _ => {}
    }
    let node = compiler.compile(&preprocess(item), context)?;
    engine.add(&node)?;
    Ok(())
}

/// Bare text becomes a paragraph; a table is wrapped in a paragraph with extra
/// leading so the engine keeps it off a page boundary.
fn preprocess(item: &Value) -> Value {
    if leaf_text(item).is_some() {
        return json!(["paragraph", item]);
    }
    match tag_of(item) {
        Some(Tag::Table | Tag::GridTable) => json!(["paragraph", {"leading": TABLE_WRAP_LEADING}, item]),
        _ => item.clone(),
    }
}

/// The engine's own text metrics, used to place stamped footers.
struct EngineMetrics<'a>(&'a dyn DocumentEngine);

impl TextMeasure for EngineMetrics<'_> {
    fn text_width(&self, text: &str, font: &Font) -> f32 {
        self.0.text_width(text, font)
    }
}

/// A source with one item already taken off its front.
struct Prepended<S> {
    first: Option<Value>,
    rest: S,
}

impl<S: ItemSource> ItemSource for Prepended<S> {
    fn next_item(&mut self) -> Result<Option<Value>, PipelineError> {
        match self.first.take() {
            Some(item) => Ok(Some(item)),
            None => self.rest.next_item(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_model::Node;
    use sheaf_style::PageGeometry;
    use sheaf_traits::{DocumentInfo, EngineError, RunningFooter};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open,
        Header(Option<String>),
        Footer(bool),
        Add(&'static str),
        Break,
        Close,
    }

    /// Records calls and keeps a page counter the way a flow engine would.
    struct RecordingEngine {
        log: Rc<RefCell<Vec<Event>>>,
        page: u32,
        page_has_content: bool,
    }

    impl TextMeasure for RecordingEngine {
        fn text_width(&self, text: &str, font: &Font) -> f32 {
            text.len() as f32 * font.size * 0.5
        }
    }

    impl DocumentEngine for RecordingEngine {
        fn set_geometry(&mut self, _geometry: PageGeometry) {}
        fn set_info(&mut self, _info: DocumentInfo) {}
        fn set_footer(&mut self, footer: Option<RunningFooter>) {
            self.log.borrow_mut().push(Event::Footer(footer.is_some()));
        }
        fn add_page_event(&mut self, _event: Arc<dyn PageEvent>) {}
        fn open(&mut self) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Event::Open);
            Ok(())
        }
        fn set_header(&mut self, header: Option<String>) {
            self.log.borrow_mut().push(Event::Header(header));
        }
        fn add(&mut self, node: &Node) -> Result<(), EngineError> {
            self.page_has_content = true;
            self.log.borrow_mut().push(Event::Add(node.kind()));
            Ok(())
        }
        fn new_page(&mut self) -> Result<bool, EngineError> {
            if !self.page_has_content {
                return Ok(false);
            }
            self.page += 1;
            self.page_has_content = false;
            self.log.borrow_mut().push(Event::Break);
            Ok(true)
        }
        fn page_number(&self) -> u32 {
            self.page
        }
        fn close(&mut self, out: &mut dyn Write) -> Result<u32, EngineError> {
            self.log.borrow_mut().push(Event::Close);
            out.write_all(b"recorded")?;
            Ok(self.page)
        }
    }

    fn recording() -> (Assembler, Rc<RefCell<Vec<Event>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let shared = Rc::clone(&log);
        let assembler = Assembler::new().with_engine_factory(Box::new(move || {
            Box::new(RecordingEngine {
                log: Rc::clone(&shared),
                page: 1,
                page_has_content: false,
            })
        }));
        (assembler, log)
    }

    fn run(document: Value) -> (Result<BuildSummary, PipelineError>, Vec<Event>) {
        let (assembler, log) = recording();
        let mut out = Vec::new();
        let result = assembler.build(&document, Destination::writer(&mut out));
        let events = log.borrow().clone();
        (result, events)
    }

    fn breaks(events: &[Event]) -> usize {
        events.iter().filter(|e| **e == Event::Break).count()
    }

    #[test]
    fn clear_double_page_landing_on_an_even_page_adds_a_filler_page() {
        // Page 1 has content; the break lands on page 2, so a blank page follows.
        let (result, events) = run(json!([{"footer": false}, "one", ["clear-double-page"], "three"]));
        result.unwrap();
        assert_eq!(breaks(&events), 2);
        assert!(events.contains(&Event::Add("spacer")));
    }

    #[test]
    fn clear_double_page_from_an_even_page_needs_no_filler() {
        let (result, events) = run(json!([
            {"footer": false},
            "one", ["pagebreak"], "two", ["clear-double-page"], "three"
        ]));
        result.unwrap();
        assert_eq!(breaks(&events), 2);
        assert!(!events.contains(&Event::Add("spacer")));
    }

    #[test]
    fn items_are_preprocessed_before_compiling() {
        let (result, events) = run(json!([
            {},
            "plain",
            42,
            ["table", ["a", "b"]],
            [["paragraph", "grouped"], "also grouped"]
        ]));
        result.unwrap();
        let added: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Add(kind) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec!["paragraph"; 5]);
    }

    #[test]
    fn preprocess_wraps_tables_with_leading() {
        let wrapped = preprocess(&json!(["table", ["a"]]));
        assert_eq!(wrapped, json!(["paragraph", {"leading": 20.0}, ["table", ["a"]]]));
        assert_eq!(preprocess(&json!("x")), json!(["paragraph", "x"]));
        assert_eq!(preprocess(&json!(["list", "a"])), json!(["list", "a"]));
    }

    #[test]
    fn letterhead_comes_before_the_header() {
        let (result, events) = run(json!([
            {"letterhead": ["Acme Corp"], "header": "Confidential", "footer": false},
            "body"
        ]));
        result.unwrap();
        assert_eq!(
            events,
            vec![
                Event::Footer(false),
                Event::Open,
                Event::Add("paragraph"),
                Event::Header(Some("Confidential".into())),
                Event::Add("paragraph"),
                Event::Close,
            ]
        );
    }

    #[test]
    fn unknown_page_events_are_configuration_errors() {
        let (result, events) = run(json!([{"page-events": ["watermark"]}, "body"]));
        assert!(matches!(result, Err(PipelineError::Config(_))));
        assert!(!events.contains(&Event::Open));
    }

    #[test]
    fn compile_errors_abort_the_build() {
        let (result, events) = run(json!([{}, "fine", ["blink", "no"]]));
        assert!(matches!(result, Err(PipelineError::Compile(_))));
        assert!(!events.contains(&Event::Close));
    }

    #[test]
    fn a_document_must_be_an_array() {
        let (result, _) = run(json!({"title": "only metadata"}));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn streams_without_metadata_start_with_an_item() {
        let (assembler, log) = recording();
        let mut out = Vec::new();
        let summary = assembler
            .build_from_reader(r#""first" ["paragraph", "second"]"#.as_bytes(), Destination::writer(&mut out))
            .unwrap();
        assert_eq!(summary.strategy, OutputStrategy::DirectWrite);
        let adds = log.borrow().iter().filter(|e| matches!(e, Event::Add(_))).count();
        assert_eq!(adds, 2);
        assert_eq!(out, b"recorded");
    }
}
