use crate::domain::DedupScope;
use crate::scraper::fetcher::BOT_CHALLENGE_MARKER;
use crate::scraper::{FetchResponse, Fetcher, PageBody, PageSource, Pacing, ScraperError};
use crate::sinks::gsheets::{Alignment, CellRange, RemoteDocument, SheetsApi};
use crate::sinks::{Commit, ResultBatch, ResultSink};
use reqwest::header::HeaderMap;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

pub const TEST_ORIGIN: &str = "http://zillow.test";

pub fn start_url(postal_code: &str) -> String {
    format!(
        "{TEST_ORIGIN}/homes/for_sale/{postal_code}_rb/?fromHomePage=true&shouldFireSellPageImplicitClaimGA=false&fromHomePageTab=buy"
    )
}

pub fn page_url(postal_code: &str, page: u32) -> String {
    format!("{TEST_ORIGIN}/homes/for_sale/{postal_code}_rb/{page}_p")
}

/// Fetcher that replays canned responses per URL. Unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: RefCell<HashMap<String, VecDeque<FetchResponse>>>,
    requested: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(FetchResponse {
                status,
                body: body.to_string(),
            });
        self
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.respond(url, 200, body)
    }

    pub fn blocked(self, url: &str) -> Self {
        self.respond(url, 200, &format!("<html><p>{BOT_CHALLENGE_MARKER}</p></html>"))
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn get(&self, url: &str, _headers: &HeaderMap) -> Result<FetchResponse, ScraperError> {
        self.requested.borrow_mut().push(url.to_string());

        let mut responses = self.responses.borrow_mut();
        let Some(queue) = responses.get_mut(url) else {
            return Ok(FetchResponse {
                status: 404,
                body: String::new(),
            });
        };
        // The last canned response repeats once the queue runs down to it.
        let resp = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(resp.unwrap_or(FetchResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

/// Visits pages in descending order without sleeping and counts the delays
/// it is asked for.
#[derive(Default)]
pub struct ReversePacing {
    page_delays: Cell<usize>,
    retry_delays: Cell<usize>,
}

impl ReversePacing {
    pub fn page_delays(&self) -> usize {
        self.page_delays.get()
    }

    pub fn retry_delays(&self) -> usize {
        self.retry_delays.get()
    }
}

impl Pacing for ReversePacing {
    fn order_pages(&self, pages: &mut [u32]) {
        pages.sort_unstable_by(|a, b| b.cmp(a));
    }

    fn page_delay(&self) -> Duration {
        self.page_delays.set(self.page_delays.get() + 1);
        Duration::ZERO
    }

    fn retry_delay(&self, _attempt: u32) -> Duration {
        self.retry_delays.set(self.retry_delays.get() + 1);
        Duration::ZERO
    }
}

/// Page source backed by in-memory pages, with optional per-code failures.
#[derive(Default)]
pub struct StaticPages {
    pages: HashMap<String, Vec<String>>,
    blocked: Vec<String>,
    requested: RefCell<Vec<String>>,
}

impl StaticPages {
    pub fn with(mut self, postal_code: &str, pages: Vec<String>) -> Self {
        self.pages.insert(postal_code.to_string(), pages);
        self
    }

    pub fn blocking(mut self, postal_code: &str) -> Self {
        self.blocked.push(postal_code.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl PageSource for StaticPages {
    fn pages(&self, postal_code: &str) -> Result<Vec<PageBody>, ScraperError> {
        self.requested.borrow_mut().push(postal_code.to_string());
        if self.blocked.iter().any(|b| b == postal_code) {
            return Err(ScraperError::Blocked {
                url: start_url(postal_code),
            });
        }
        Ok(self
            .pages
            .get(postal_code)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, html)| PageBody {
                page: i as u32 + 1,
                html,
            })
            .collect())
    }
}

/// `(address, broker)` pairs as a comment-wrapped search-store script.
pub fn store_script(listings: &[(&str, &str)]) -> String {
    let results: Vec<serde_json::Value> = listings
        .iter()
        .map(|(address, broker)| {
            serde_json::json!({
                "addressWithZip": address,
                "brokerName": broker,
                "price": "$400,000",
                "beds": 3,
                "baths": 2,
                "area": 1500,
                "detailUrl": "/homedetails/x/1_zpid/",
                "statusText": "House for sale",
                "hdpData": { "homeInfo": { "city": "Seattle", "state": "WA", "zipcode": "98101", "daysOnZillow": 2 } }
            })
        })
        .collect();
    let store = serde_json::json!({ "searchResults": { "listResults": results } });
    format!(
        r#"<script type="application/json" data-zrr-shared-data-key="mobileSearchPageStore"><!--{store}--></script>"#
    )
}

/// `(address, broker)` pairs as result cards with their ld+json fragments.
pub fn card_markup(listings: &[(&str, &str)]) -> String {
    let items: String = listings
        .iter()
        .map(|(address, broker)| {
            format!(
                r#"<li>
                  <article class="list-card list-card-short list-card_not-saved">
                    <h3 class="list-card-addr">{address}</h3>
                    <div class="list-card-price">$410,000</div>
                    <div class="list-card-truncate">{broker}</div>
                  </article>
                  <script type="application/ld+json">{{"@type": "SingleFamilyResidence",
                    "address": {{"addressLocality": "Seattle", "addressRegion": "WA", "postalCode": "98101"}},
                    "numberOfRooms": 3, "url": "/homedetails/y/2_zpid/"}}</script>
                </li>"#
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

/// A results page with a result-count subtitle and optional "next" link.
pub fn search_page(total_results: usize, next_href: Option<&str>, content: &str) -> String {
    let next = next_href
        .map(|href| {
            format!(r#"<ul><li class="zsg-pagination-next"><a href="{href}">Next</a></li></ul>"#)
        })
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div><div><div class="search-subtitle"><span class="result-count">{total_results} homes</span></div></div></div>
        {content}
        {next}
        </body></html>"#
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Add { postal_code: String, addresses: Vec<String> },
    Finalize,
}

/// Sink that only records what it was handed.
pub struct RecordingSink {
    scope: DedupScope,
    events: Rc<RefCell<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new(scope: DedupScope) -> (Self, Rc<RefCell<Vec<SinkEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                scope,
                events: Rc::clone(&events),
            },
            events,
        )
    }
}

impl ResultSink for RecordingSink {
    fn dedup_scope(&self) -> DedupScope {
        self.scope
    }

    fn add(&mut self, postal_code: &str, batch: ResultBatch) -> Result<(), ScraperError> {
        self.events.borrow_mut().push(SinkEvent::Add {
            postal_code: postal_code.to_string(),
            addresses: batch.into_iter().map(|l| l.address).collect(),
        });
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Commit, ScraperError> {
        self.events.borrow_mut().push(SinkEvent::Finalize);
        Ok(Commit::File("recorded".into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Create { title: String, first_sheet: String },
    AddSheet { title: String, rows: u32, cols: u32 },
    Write { sheet: String, rows: Vec<Vec<String>> },
    Format { range: CellRange, alignment: Alignment },
    Share { email: String },
}

/// In-memory `SheetsApi` that logs every call.
#[derive(Default)]
pub struct RecordingSheets {
    calls: Rc<RefCell<Vec<SheetCall>>>,
    fail_on_sheet: Option<String>,
    next_sheet_id: RefCell<i64>,
}

impl RecordingSheets {
    pub fn failing_on_sheet(title: &str) -> Self {
        Self {
            fail_on_sheet: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Rc<RefCell<Vec<SheetCall>>> {
        Rc::clone(&self.calls)
    }
}

impl SheetsApi for RecordingSheets {
    fn create_document(
        &self,
        title: &str,
        first_sheet_title: &str,
    ) -> Result<RemoteDocument, ScraperError> {
        self.calls.borrow_mut().push(SheetCall::Create {
            title: title.to_string(),
            first_sheet: first_sheet_title.to_string(),
        });
        Ok(RemoteDocument {
            id: "doc-1".into(),
            url: "https://docs.test/doc-1".into(),
            first_sheet_id: 0,
        })
    }

    fn add_sheet(
        &self,
        _document_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<i64, ScraperError> {
        if self.fail_on_sheet.as_deref() == Some(title) {
            return Err(ScraperError::Sink(format!("addSheet {title}: quota exceeded")));
        }
        self.calls.borrow_mut().push(SheetCall::AddSheet {
            title: title.to_string(),
            rows,
            cols,
        });
        let mut id = self.next_sheet_id.borrow_mut();
        *id += 1;
        Ok(*id)
    }

    fn write_rows(
        &self,
        _document_id: &str,
        sheet_title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), ScraperError> {
        self.calls.borrow_mut().push(SheetCall::Write {
            sheet: sheet_title.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }

    fn format_range(
        &self,
        _document_id: &str,
        range: CellRange,
        alignment: Alignment,
    ) -> Result<(), ScraperError> {
        self.calls
            .borrow_mut()
            .push(SheetCall::Format { range, alignment });
        Ok(())
    }

    fn share(&self, _document_id: &str, email: &str, _message: &str) -> Result<(), ScraperError> {
        self.calls.borrow_mut().push(SheetCall::Share {
            email: email.to_string(),
        });
        Ok(())
    }
}
