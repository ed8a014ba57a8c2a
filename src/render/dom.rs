//! DOM render adapter (WASM only)
//!
//! Each reel is an element `#reel-{id}` holding a `.reel-strip` child that is
//! translated by the wrapped offset.

use std::collections::HashMap;

use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use super::RenderAdapter;
use crate::ReelId;

pub struct DomReelAdapter {
    strips: HashMap<ReelId, HtmlElement>,
}

impl DomReelAdapter {
    /// Look up the strip elements for `reels`; missing ones are skipped with a warning
    pub fn new(reels: &[ReelId]) -> Self {
        let mut strips = HashMap::new();
        let document = web_sys::window().and_then(|w| w.document());

        if let Some(document) = document {
            for &id in reels {
                let selector = format!("#reel-{id} .reel-strip");
                match document.query_selector(&selector).ok().flatten() {
                    Some(el) => match el.dyn_into::<HtmlElement>() {
                        Ok(el) => {
                            strips.insert(id, el);
                        }
                        Err(_) => log::warn!("{selector} is not an HTML element"),
                    },
                    None => log::warn!("No strip element for reel {id}"),
                }
            }
        }

        Self { strips }
    }
}

impl RenderAdapter for DomReelAdapter {
    fn set_offset(&mut self, reel: ReelId, offset_px: f64, blur: f64) {
        if let Some(strip) = self.strips.get(&reel) {
            let style = strip.style();
            let _ = style.set_property("transform", &format!("translateY({:.2}px)", -offset_px));
            let _ = style.set_property("filter", &format!("blur({:.2}px)", blur));
        }
    }
}
