//! Page classification and value extraction.
//!
//! [`PageClassifier`] turns raw portal markup into a [`PageState`] and pulls
//! out the values the navigator and the service need: anti-tampering tokens,
//! the floor of a device list, and per-device enabled flags.
//!
//! Nothing here returns an error. Markup that cannot be understood degrades
//! to [`PageState::Unknown`], empty tokens, `None` or `false`, so a best-effort
//! answer is always produced and the navigator decides what is fatal.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use twocold_types::{DeviceRecord, DeviceView, Floor, PageState, SessionTokens};

use crate::markup;
use crate::settings::RoomIds;

/// A portal page parsed once for several lookups.
///
/// Holds the parsed document, so it is not `Send` and should not be kept
/// across an `.await`.
pub struct ParsedPage {
    document: Html,
}

impl ParsedPage {
    pub fn parse(markup: &str) -> Self {
        Self {
            document: Html::parse_document(markup),
        }
    }
}

impl std::fmt::Debug for ParsedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedPage").finish_non_exhaustive()
    }
}

/// Classifies portal pages and extracts values from them.
#[derive(Debug, Clone, Default)]
pub struct PageClassifier {
    rooms: RoomIds,
}

impl PageClassifier {
    /// Create a classifier that maps the given room identifiers to floors.
    pub fn new(rooms: RoomIds) -> Self {
        Self { rooms }
    }

    /// Room identifiers used by this classifier.
    pub fn rooms(&self) -> &RoomIds {
        &self.rooms
    }

    /// Determine which page `markup` is.
    ///
    /// The title decides between the login page and the room picker; failing
    /// that, any toggle anchor marks a device list.
    pub fn classify(&self, markup: &str) -> PageState {
        self.state_of(&ParsedPage::parse(markup))
    }

    /// [`classify`](Self::classify) for an already parsed page.
    pub fn state_of(&self, page: &ParsedPage) -> PageState {
        let document = &page.document;

        match title(document).as_deref() {
            Some(markup::LOGIN_TITLE) => return PageState::Login,
            Some(markup::ROOM_SELECTION_TITLE) => return PageState::RoomSelection,
            _ => {}
        }

        if first(document, &markup::toggle_marker_selector()).is_some() {
            return PageState::DeviceList(self.floor_of(document));
        }

        PageState::Unknown
    }

    /// Read the view state and event validation tokens.
    ///
    /// Missing fields yield empty strings.
    pub fn extract_tokens(&self, markup: &str) -> SessionTokens {
        self.tokens_of(&ParsedPage::parse(markup))
    }

    /// [`extract_tokens`](Self::extract_tokens) for an already parsed page.
    pub fn tokens_of(&self, page: &ParsedPage) -> SessionTokens {
        let document = &page.document;
        SessionTokens {
            view_state: input_value(document, markup::VIEW_STATE_FIELD).unwrap_or_default(),
            event_validation: input_value(document, markup::EVENT_VALIDATION_FIELD)
                .unwrap_or_default(),
        }
    }

    /// Floor of the room shown on the page, if it is one of the known rooms.
    pub fn extract_floor(&self, markup: &str) -> Option<Floor> {
        self.floor_of(&Html::parse_document(markup))
    }

    /// Merge `records` on `floor` with the enabled flags shown on the page.
    ///
    /// Records keep their registry order. A device whose control cannot be
    /// found is reported as disabled.
    pub fn extract_device_views(
        &self,
        markup: &str,
        floor: Floor,
        records: &[DeviceRecord],
    ) -> Vec<DeviceView> {
        let document = Html::parse_document(markup);
        records
            .iter()
            .filter(|record| record.floor == floor)
            .map(|record| {
                let enabled = is_enabled(&document, record.command_index);
                record.clone().into_view(enabled)
            })
            .collect()
    }

    fn floor_of(&self, document: &Html) -> Option<Floor> {
        let room = input_value(document, markup::ROOM_FIELD)?;
        let floor = self.rooms.floor_for(&room);
        if floor.is_none() {
            debug!("Room '{}' does not belong to a known floor", room);
        }
        floor
    }
}

fn is_enabled(document: &Html, command_index: u32) -> bool {
    match first(document, &markup::toggle_label_selector(command_index)) {
        Some(label) => text_of(label) == "1",
        None => {
            debug!("No toggle control for command index {}", command_index);
            false
        }
    }
}

fn title(document: &Html) -> Option<String> {
    first(document, "title").map(text_of)
}

fn input_value(document: &Html, id: &str) -> Option<String> {
    first(document, &markup::input_selector(id))
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

fn first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).next(),
        Err(e) => {
            debug!("Invalid selector '{}': {:?}", selector, e);
            None
        }
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
