use overlay_ecs::components::Bounds;
use overlay_ecs::ElementTable;
use overlay_index::SpanIssue;
use overlay_protocol::{AnnotatedDocument, Code, DocumentId, GroupId, SelectionRange, SpanId, SpanKey, SpanRecord, ViewportWindow};
use overlay_select::RawSelection;
use overlay_session::{decode_document, OverlayConfig, OverlaySession};
use overlay_view::{write_html, RenderedUnit};
use serde::Serialize;
use tracing::debug;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Splits plain text into a token model the host can annotate.
#[wasm_bindgen]
pub fn tokenize(text: &str) -> Result<JsValue, JsError> {
    Ok(serde_wasm_bindgen::to_value(&overlay_tokenizer::tokenize(text))?)
}

/// Everything the host needs to paint the current window.
#[derive(Debug, Serialize)]
pub struct RenderFrame {
    pub total_height: f64,
    pub window: Option<ViewportWindow>,
    pub units: Vec<RenderedUnit>,
    /// Pre-built markup, one entry per unit.
    pub html: Vec<String>,
}

impl RenderFrame {
    fn new(total_height: f64, window: Option<ViewportWindow>, units: Vec<RenderedUnit>) -> Self {
        let html = units.iter().map(write_html).collect();
        Self { total_height, window, units, html }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueView {
    pub key: SpanKey,
    pub message: String,
}

impl From<&SpanIssue> for IssueView {
    fn from(issue: &SpanIssue) -> Self {
        Self { key: issue.key(), message: issue.to_string() }
    }
}

fn visible_frame(session: &mut OverlaySession) -> RenderFrame {
    let units = session.render_visible();
    RenderFrame::new(session.total_height(), session.window(), units)
}

fn page_frame(session: &mut OverlaySession, page: usize) -> RenderFrame {
    let units = session.render_page(page);
    RenderFrame::new(session.total_height(), None, units)
}

fn issue_views(session: &OverlaySession) -> Vec<IssueView> {
    session.issues().iter().map(IssueView::from).collect()
}

/// The annotation overlay running in the browser.
#[wasm_bindgen]
pub struct AnnotatorEngine {
    session: OverlaySession,
}

#[wasm_bindgen]
impl AnnotatorEngine {
    /// `config` is an `OverlayConfig` object; pass `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<AnnotatorEngine, JsError> {
        let config: OverlayConfig = if config.is_undefined() || config.is_null() {
            OverlayConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self { session: OverlaySession::new(config)? })
    }

    /// Loads an `AnnotatedDocument` object and returns the span issues.
    pub fn load_document(&mut self, document: JsValue) -> Result<JsValue, JsError> {
        let document: AnnotatedDocument = serde_wasm_bindgen::from_value(document)?;
        self.session.load_document(&document)?;
        Ok(serde_wasm_bindgen::to_value(&issue_views(&self.session))?)
    }

    /// Loads a compiled archive (fetched as bytes).
    pub fn load_archive(&mut self, bytes: Vec<u8>) -> Result<JsValue, JsError> {
        let document = decode_document(&bytes)?;
        debug!(document_id = %document.document_id, "loading archived document");
        self.session.load_document(&document)?;
        Ok(serde_wasm_bindgen::to_value(&issue_views(&self.session))?)
    }

    /// Replaces the annotation layer with a list of `SpanRecord`s.
    pub fn load_annotations(&mut self, records: JsValue) -> Result<JsValue, JsError> {
        let records: Vec<SpanRecord> = serde_wasm_bindgen::from_value(records)?;
        self.session.load_annotations(records);
        Ok(serde_wasm_bindgen::to_value(&issue_views(&self.session))?)
    }

    pub fn document_id(&self) -> Option<u32> {
        self.session.document_id().map(DocumentId::get)
    }

    pub fn token_count(&self) -> usize {
        self.session.tokens().len()
    }

    pub fn issues(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&issue_views(&self.session))?)
    }

    // --- Selection ---

    /// Resolves a `RawSelection` to a token range, or `undefined`.
    pub fn resolve_selection(&self, selection: JsValue) -> Result<JsValue, JsError> {
        let selection: RawSelection = serde_wasm_bindgen::from_value(selection)?;
        Ok(serde_wasm_bindgen::to_value(&self.session.resolve_selection(&selection))?)
    }

    pub fn resolve_point_selection(&self, ax: f64, ay: f64, fx: f64, fy: f64) -> Result<JsValue, JsError> {
        let range = self.session.resolve_point_selection((ax, ay), (fx, fy));
        Ok(serde_wasm_bindgen::to_value(&range)?)
    }

    /// Resolves the selection and queues a span request for it.
    pub fn request_span(&mut self, selection: JsValue) -> Result<JsValue, JsError> {
        let selection: RawSelection = serde_wasm_bindgen::from_value(selection)?;
        Ok(serde_wasm_bindgen::to_value(&self.session.request_span(&selection))?)
    }

    // --- Span updates ---

    pub fn create_span(&mut self, begin_token: u32, end_token: u32, code: JsValue) -> Result<u64, JsError> {
        let code: Code = serde_wasm_bindgen::from_value(code)?;
        let key = self.session.create_span(SelectionRange::new(begin_token, end_token), code)?;
        Ok(key.get())
    }

    pub fn promote_span(&mut self, key: u64, id: u32) -> Result<(), JsError> {
        Ok(self.session.promote_span(SpanKey(key), SpanId(id))?)
    }

    /// Returns the key of the new version.
    pub fn update_span(&mut self, key: u64, begin_token: u32, end_token: u32, code: JsValue) -> Result<u64, JsError> {
        let code: Code = serde_wasm_bindgen::from_value(code)?;
        let key = self
            .session
            .update_span(SpanKey(key), SelectionRange::new(begin_token, end_token), code)?;
        Ok(key.get())
    }

    pub fn delete_span(&mut self, key: u64) -> Result<(), JsError> {
        self.session.delete_span(SpanKey(key))?;
        Ok(())
    }

    pub fn set_span_groups(&mut self, key: u64, groups: Vec<u32>) -> Result<(), JsError> {
        let groups = groups.into_iter().map(GroupId).collect();
        Ok(self.session.set_span_groups(SpanKey(key), groups)?)
    }

    pub fn spans_at(&self, token: u32) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.session.spans_at(token))?)
    }

    pub fn spans_at_element(&self, element_id: u64) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.session.spans_at_element(element_id))?)
    }

    /// Pending `OverlayEvent`s, oldest first.
    pub fn drain_events(&mut self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.session.drain_events())?)
    }

    // --- Viewport ---

    pub fn scroll_to(&mut self, offset: f64) -> bool {
        self.session.scroll_to(offset)
    }

    pub fn resize(&mut self, viewport_height: f64) -> bool {
        self.session.resize(viewport_height)
    }

    pub fn measure_unit(&mut self, unit: usize, size: f64) -> bool {
        self.session.measure_unit(unit, size)
    }

    pub fn total_height(&self) -> f64 {
        self.session.total_height()
    }

    pub fn offset_of_token(&self, token: u32) -> Option<f64> {
        self.session.offset_of_token(token)
    }

    pub fn element_for_token(&self, token: u32) -> Option<u64> {
        self.session.elements().element_of(token).map(ElementTable::element_id)
    }

    pub fn set_element_bounds(&mut self, token: u32, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.session.set_element_bounds(token, Bounds { x, y, width, height })
    }

    pub fn render(&mut self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&visible_frame(&mut self.session))?)
    }

    pub fn page_count(&self) -> usize {
        self.session.pager().page_count()
    }

    pub fn render_page(&mut self, page: usize) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&page_frame(&mut self.session, page))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_session() -> OverlaySession {
        let text = "The cat sat. A dog ran.";
        let mut document = overlay_tokenizer::tokenize(text).into_document(DocumentId(1), text);
        document.spans.push(SpanRecord {
            id: Some(SpanId(9)),
            begin_token: 1,
            end_token: 2,
            code: Code { id: overlay_protocol::CodeId(1), name: "Animal".into(), color: "#f80".into() },
            groups: Vec::new(),
        });
        document.spans.push(SpanRecord {
            id: None,
            begin_token: 4,
            end_token: 99,
            code: Code { id: overlay_protocol::CodeId(2), name: "Broken".into(), color: "#000".into() },
            groups: Vec::new(),
        });

        let mut session = OverlaySession::new(OverlayConfig::default()).unwrap();
        session.load_document(&document).unwrap();
        session
    }

    #[test]
    fn test_visible_frame_carries_markup_per_unit() {
        let mut session = loaded_session();
        session.resize(500.0);

        let frame = visible_frame(&mut session);
        assert_eq!(frame.units.len(), frame.html.len());
        assert!(frame.window.is_some());
        assert!(frame.html[0].contains("Animal"));
        assert!(frame.total_height > 0.0);
    }

    #[test]
    fn test_element_for_token_follows_mounting() {
        let mut engine = AnnotatorEngine { session: loaded_session() };
        assert_eq!(engine.element_for_token(1), None);

        engine.resize(100.0);
        visible_frame(&mut engine.session);

        let id = engine.element_for_token(1).unwrap();
        assert_eq!(engine.session.spans_at_element(id).len(), 1);
        assert_eq!(engine.element_for_token(99), None);
    }

    #[test]
    fn test_page_frame_has_no_window() {
        let mut session = loaded_session();
        let frame = page_frame(&mut session, 0);
        assert!(frame.window.is_none());
        assert_eq!(frame.units.len(), session.layout().len());
    }

    #[test]
    fn test_issue_views_name_the_dropped_span() {
        let session = loaded_session();
        let views = issue_views(&session);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].key, SpanKey(2));
        assert!(views[0].message.contains("99"));
    }
}
