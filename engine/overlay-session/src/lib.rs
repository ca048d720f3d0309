//! The rendering context: owns the token model, the span set, the derived
//! annotation index, the viewport and the element table, and exposes the
//! update API the host drives them through.
//!
//! Derived structures are never patched. Every change to tokens or spans
//! rebuilds them from the current inputs.

pub mod archive;
pub mod config;
pub mod error;
pub mod events;

pub use archive::{decode_document, encode_document};
pub use config::OverlayConfig;
pub use error::SessionError;
pub use events::OverlayEvent;

use std::collections::VecDeque;

use overlay_ecs::components::{Bounds, ElementKind};
use overlay_ecs::ElementTable;
use overlay_index::{build_index, AnnotationIndex, SpanIssue};
use overlay_protocol::{
    AnnotatedDocument, AnnotationSpan, Code, DocumentId, GroupId, SelectionRange, SpanId, SpanKey, SpanRecord,
    Token, ViewportWindow,
};
use overlay_select::{resolve_bounded, DocumentOrder, RawSelection, SelectionPoint};
use overlay_view::{render_unit, Pager, RenderedUnit, Scheduler, UnitLayout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Ready,
    /// The last document could not be turned into a token model.
    Failed,
}

pub struct OverlaySession {
    config: OverlayConfig,
    state: LoadState,
    document_id: Option<DocumentId>,
    tokens: Vec<Token>,
    layout: UnitLayout,
    spans: Vec<AnnotationSpan>,
    index: AnnotationIndex,
    issues: Vec<SpanIssue>,
    scheduler: Scheduler,
    pager: Pager,
    elements: ElementTable,
    next_key: u64,
    events: VecDeque<OverlayEvent>,
}

impl OverlaySession {
    pub fn new(config: OverlayConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            scheduler: Scheduler::new(0, &config.view),
            pager: Pager::new(config.view.elements_per_page, 0),
            config,
            state: LoadState::Empty,
            document_id: None,
            tokens: Vec::new(),
            layout: UnitLayout::default(),
            spans: Vec::new(),
            index: AnnotationIndex::default(),
            issues: Vec::new(),
            elements: ElementTable::new(),
            next_key: 1,
            events: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn layout(&self) -> &UnitLayout {
        &self.layout
    }

    /// Every span of the annotation layer, including ones the index dropped.
    pub fn spans(&self) -> &[AnnotationSpan] {
        &self.spans
    }

    pub fn index(&self) -> &AnnotationIndex {
        &self.index
    }

    /// Spans left out of the current index.
    pub fn issues(&self) -> &[SpanIssue] {
        &self.issues
    }

    pub fn elements(&self) -> &ElementTable {
        &self.elements
    }

    // --- Loading ---

    /// Loads a document with its annotation layer.
    pub fn load_document(&mut self, document: &AnnotatedDocument) -> Result<&[SpanIssue], SessionError> {
        self.load_tokens(
            document.document_id,
            &document.text,
            &document.tokens,
            &document.token_character_offsets,
            &document.sentence_token_ranges,
        )?;
        Ok(self.load_annotations(document.spans.iter().cloned()))
    }

    /// Replaces the token model. The previous document's spans, measurements
    /// and mounted elements are discarded; on failure the session is left
    /// empty in the `Failed` state.
    pub fn load_tokens(
        &mut self,
        document_id: DocumentId,
        raw_text: &str,
        tokens: &[String],
        character_offsets: &[(u32, u32)],
        sentence_ranges: &[(u32, u32)],
    ) -> Result<(), SessionError> {
        let built = overlay_tokens::build(raw_text, tokens, character_offsets);

        self.spans.clear();
        self.elements.clear();

        match built {
            Ok(tokens) => {
                self.tokens = tokens;
                self.document_id = Some(document_id);
                self.state = LoadState::Ready;
            }
            Err(err) => {
                warn!(%document_id, error = %err, "document load failed");
                self.tokens.clear();
                self.document_id = None;
                self.state = LoadState::Failed;
                self.rebuild_layout(&[]);
                self.rebuild_index();
                return Err(err.into());
            }
        }

        self.rebuild_layout(sentence_ranges);
        self.rebuild_index();
        info!(%document_id, tokens = self.tokens.len(), units = self.layout.len(), "document loaded");
        Ok(())
    }

    /// Replaces the annotation layer. Keys follow load order.
    pub fn load_annotations<I>(&mut self, records: I) -> &[SpanIssue]
    where
        I: IntoIterator<Item = SpanRecord>,
    {
        let spans: Vec<AnnotationSpan> = records
            .into_iter()
            .map(|record| {
                let key = self.allocate_key();
                AnnotationSpan::from_record(key, record)
            })
            .collect();
        self.spans = spans;
        self.rebuild_index();
        &self.issues
    }

    fn allocate_key(&mut self) -> SpanKey {
        let key = SpanKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn rebuild_layout(&mut self, sentence_ranges: &[(u32, u32)]) {
        self.layout = UnitLayout::from_sentences(sentence_ranges, self.tokens.len(), self.config.view.tokens_per_unit);
        self.scheduler.set_unit_count(self.layout.len());
        self.scheduler.set_scroll_offset(0.0);
        self.pager.set_total(self.layout.len());
        self.pager.go_to(0);
    }

    fn rebuild_index(&mut self) {
        let (index, issues) = build_index(&self.spans, self.tokens.len());
        self.index = index;
        self.issues = issues;
    }

    // --- Selection ---

    /// Maps a selection to whole tokens of the current document.
    pub fn resolve_selection(&self, selection: &RawSelection) -> Option<SelectionRange> {
        resolve_bounded(selection, self.tokens.len())
    }

    /// Like [`Self::resolve_selection`] for endpoints given as element ids
    /// (see [`ElementTable::element_id`]). Placeholders and unknown elements
    /// do not resolve.
    pub fn resolve_element_selection(
        &self,
        anchor: Option<(u64, u32)>,
        focus: Option<(u64, u32)>,
        document_order: DocumentOrder,
    ) -> Option<SelectionRange> {
        let point = |endpoint: Option<(u64, u32)>| {
            let (id, offset) = endpoint?;
            let element = ElementTable::element_from_id(id)?;
            let token = self.elements.token_of(element)?;
            Some(SelectionPoint { token, offset })
        };
        self.resolve_selection(&RawSelection { anchor: point(anchor), focus: point(focus), document_order })
    }

    /// Resolves a drag between two positions through the element bounds the
    /// host reported.
    pub fn resolve_point_selection(&self, anchor: (f64, f64), focus: (f64, f64)) -> Option<SelectionRange> {
        let a = self.elements.hit_test(anchor.0, anchor.1);
        let f = self.elements.hit_test(focus.0, focus.1);

        let document_order = match (a, f) {
            (Some(a), Some(f)) if (f.token, f.offset) < (a.token, a.offset) => DocumentOrder::FocusBeforeAnchor,
            (Some(a), Some(f)) if a.token == f.token => DocumentOrder::Same,
            _ => DocumentOrder::AnchorBeforeFocus,
        };
        let point = |hit: Option<overlay_ecs::Hit>| hit.map(|h| SelectionPoint { token: h.token, offset: h.offset });
        self.resolve_selection(&RawSelection { anchor: point(a), focus: point(f), document_order })
    }

    /// Resolves the selection and, if it maps to tokens, asks the host for a
    /// code to annotate it with.
    pub fn request_span(&mut self, selection: &RawSelection) -> Option<SelectionRange> {
        let range = self.resolve_selection(selection)?;
        self.push_event(OverlayEvent::SpanRequested { range, code: None, key: None });
        Some(range)
    }

    // --- Span updates ---

    fn check_range(&self, range: SelectionRange) -> Result<(), SessionError> {
        if range.begin_token >= range.end_token || range.end_token as usize > self.tokens.len() {
            return Err(SessionError::InvalidRange {
                begin: range.begin_token,
                end: range.end_token,
                token_count: self.tokens.len(),
            });
        }
        Ok(())
    }

    fn position(&self, key: SpanKey) -> Result<usize, SessionError> {
        self.spans
            .iter()
            .position(|s| s.key == key)
            .ok_or(SessionError::UnknownSpan(key))
    }

    /// Adds a pending (unsaved) span.
    pub fn create_span(&mut self, range: SelectionRange, code: Code) -> Result<SpanKey, SessionError> {
        self.check_range(range)?;
        let key = self.allocate_key();
        self.spans.push(AnnotationSpan {
            key,
            id: None,
            begin_token: range.begin_token,
            end_token: range.end_token,
            code: code.clone(),
            groups: Vec::new(),
        });
        self.rebuild_index();
        debug!(%key, begin = range.begin_token, end = range.end_token, "created pending span");
        self.push_event(OverlayEvent::SpanRequested { range, code: Some(code), key: Some(key) });
        Ok(key)
    }

    /// Records the persisted id of a saved span. Not a new version: the key
    /// and stacking position stay.
    pub fn promote_span(&mut self, key: SpanKey, id: SpanId) -> Result<(), SessionError> {
        let pos = self.position(key)?;
        let promoted = AnnotationSpan { id: Some(id), ..self.spans[pos].clone() };
        self.spans[pos] = promoted;
        self.rebuild_index();
        Ok(())
    }

    /// Replaces a span's range and code. The result is a new version with a
    /// new key, so it stacks above spans created before the edit.
    pub fn update_span(&mut self, key: SpanKey, range: SelectionRange, code: Code) -> Result<SpanKey, SessionError> {
        self.check_range(range)?;
        let pos = self.position(key)?;
        let previous = self.spans.remove(pos);
        let new_key = self.allocate_key();

        self.spans.push(AnnotationSpan {
            key: new_key,
            id: previous.id,
            begin_token: range.begin_token,
            end_token: range.end_token,
            code: code.clone(),
            groups: previous.groups,
        });
        self.rebuild_index();
        self.push_event(OverlayEvent::SpanUpdated { previous: key, key: new_key, id: previous.id, range, code });
        Ok(new_key)
    }

    pub fn delete_span(&mut self, key: SpanKey) -> Result<AnnotationSpan, SessionError> {
        let pos = self.position(key)?;
        let removed = self.spans.remove(pos);
        self.rebuild_index();
        self.push_event(OverlayEvent::SpanDeleted { key, id: removed.id });
        Ok(removed)
    }

    pub fn set_span_groups(&mut self, key: SpanKey, groups: Vec<GroupId>) -> Result<(), SessionError> {
        let pos = self.position(key)?;
        let regrouped = AnnotationSpan { groups: groups.clone(), ..self.spans[pos].clone() };
        let id = regrouped.id;
        self.spans[pos] = regrouped;
        self.rebuild_index();
        self.push_event(OverlayEvent::GroupsChanged { key, id, groups });
        Ok(())
    }

    /// Spans under a token, e.g. for a context menu.
    pub fn spans_at(&self, token: u32) -> Vec<&AnnotationSpan> {
        self.index.spans_at(token).collect()
    }

    pub fn spans_at_element(&self, element_id: u64) -> Vec<&AnnotationSpan> {
        ElementTable::element_from_id(element_id)
            .and_then(|element| self.elements.token_of(element))
            .map(|token| self.spans_at(token))
            .unwrap_or_default()
    }

    // --- Events ---

    fn push_event(&mut self, event: OverlayEvent) {
        if self.events.len() >= self.config.max_pending_events {
            warn!(limit = self.config.max_pending_events, "event queue full, dropping oldest event");
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain_events(&mut self) -> Vec<OverlayEvent> {
        self.events.drain(..).collect()
    }

    // --- Viewport ---

    pub fn scroll_to(&mut self, offset: f64) -> bool {
        self.scheduler.set_scroll_offset(offset)
    }

    pub fn resize(&mut self, viewport_height: f64) -> bool {
        self.scheduler.resize(viewport_height)
    }

    pub fn measure_unit(&mut self, unit: usize, size: f64) -> bool {
        self.scheduler.measure(unit, size)
    }

    pub fn total_height(&self) -> f64 {
        self.scheduler.total_virtual_height()
    }

    pub fn window(&self) -> Option<ViewportWindow> {
        self.scheduler.window()
    }

    pub fn visible_units(&self) -> Vec<usize> {
        self.scheduler.visible_unit_indices()
    }

    /// Scroll offset that brings the unit holding `token` to the top.
    pub fn offset_of_token(&self, token: u32) -> Option<f64> {
        self.layout
            .unit_of_token(token)
            .and_then(|unit| self.scheduler.unit_offset(unit))
    }

    pub fn set_element_bounds(&mut self, token: u32, bounds: Bounds) -> bool {
        self.elements.set_bounds(token, bounds)
    }

    /// Renders the units of the current window and keeps the element table
    /// in step with them.
    pub fn render_visible(&mut self) -> Vec<RenderedUnit> {
        let units = self.scheduler.visible_unit_indices();
        self.render_units(&units)
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Renders one page of the paged (non-virtualized) variant.
    pub fn render_page(&mut self, page: usize) -> Vec<RenderedUnit> {
        self.pager.go_to(page);
        let units: Vec<usize> = self.pager.range().collect();
        self.render_units(&units)
    }

    fn render_units(&mut self, units: &[usize]) -> Vec<RenderedUnit> {
        let (layout, tokens) = (&self.layout, &self.tokens);
        self.elements.sync_units(units, |unit| unit_elements(layout, tokens, unit));

        units
            .iter()
            .filter_map(|&unit| {
                let range = self.layout.unit(unit)?;
                Some(render_unit(unit, range, &self.tokens, &self.index))
            })
            .collect()
    }
}

fn unit_elements(layout: &UnitLayout, tokens: &[Token], unit: usize) -> Vec<ElementKind> {
    layout
        .unit(unit)
        .into_iter()
        .flatten()
        .map(|index| match tokens.get(index as usize) {
            Some(token) => ElementKind::Token { index, chars: token.text.chars().count() as u32 },
            None => ElementKind::Placeholder { index },
        })
        .collect()
}
