use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::trace;

use crate::config::Color;
use crate::geometry::Polygon;
use crate::scene::{SceneObject, SceneState, SpatialIndex, Token, UniformGridIndex};
use crate::time::DebounceQueue;

use super::elevation::{BandRounding, ElevationBands};
use super::texture::{Channel, MaskTexture};

/// Delay before an occlusion-state change is applied to an object.
///
/// Suppresses flicker while a controlled token moves continuously under a
/// roof edge; commits are delayed, never dropped.
pub const OCCLUSION_TOGGLE_DELAY: Duration = Duration::from_millis(50);

/// Occlusion mask: which elevated objects should fade or hide because a
/// controlled token stands beneath them.
///
/// Channel semantics (fixed):
/// - red   = fade-occlusion amount (token footprint)
/// - green = radial-occlusion amount (footprint grown to the light radius)
/// - blue  = vision-occlusion amount (only for tokens with active vision)
///
/// Each fill value is the quantized elevation band of the token, so the
/// shader can compare against the occluded object's own band.
pub struct OcclusionMask {
    texture: MaskTexture,
    bands: ElevationBands,
    index: UniformGridIndex,
    debounce: DebounceQueue<String, bool>,
    /// Objects whose applied state is currently "occluded"; these stay in
    /// the candidate set even when no longer depth-contributing so they can
    /// un-occlude.
    occluded_ids: HashSet<String>,
}

impl OcclusionMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            texture: MaskTexture::new(width, height),
            bands: ElevationBands::new(BandRounding::Ceiling),
            index: UniformGridIndex::default(),
            debounce: DebounceQueue::new(OCCLUSION_TOGGLE_DELAY),
            occluded_ids: HashSet::new(),
        }
    }

    #[inline]
    pub fn texture(&self) -> &MaskTexture {
        &self.texture
    }

    #[inline]
    pub fn bands(&self) -> &ElevationBands {
        &self.bands
    }

    /// Normalized band for `elevation`: least tracked entry ≥ the query.
    ///
    /// # Panics
    /// Panics on a NaN elevation.
    pub fn map_elevation(&self, elevation: f32) -> f32 {
        self.bands.map_elevation(elevation)
    }

    /// Set of object ids currently judged occluded.
    pub fn occluded_ids(&self) -> &HashSet<String> {
        &self.occluded_ids
    }

    /// Per-frame occlusion pass: redraw the mask from occludable tokens,
    /// then recompute and (debounced) apply per-object occlusion states.
    pub fn update_occlusion(&mut self, scene: &mut SceneState, now: Instant) {
        let tokens: Vec<Token> = scene.occludable_tokens().cloned().collect();
        self.update_occlusion_mask(&tokens);
        self.update_occlusion_states(scene, &tokens, now);
    }

    /// Clears and redraws the mask, tokens sorted by ascending elevation so
    /// higher tokens overwrite lower ones where shapes overlap.
    fn update_occlusion_mask(&mut self, tokens: &[Token]) {
        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_by(|&a, &b| tokens[a].elevation.total_cmp(&tokens[b].elevation));

        self.bands.rebuild(tokens.iter().map(|t| t.elevation));
        self.texture.clear(Color::TRANSPARENT);

        for &i in &order {
            let token = &tokens[i];
            let value = self.bands.channel_value(token.elevation);

            let footprint = Polygon::from_rect(token.footprint);
            self.texture.fill_polygon_channel(&footprint, Channel::Red, value);

            let radial = Polygon::circle(token.center, token.occlusion_radius(), 32);
            self.texture.fill_polygon_channel(&radial, Channel::Green, value);

            if token.has_vision {
                let vision = Polygon::circle(token.center, token.occlusion_radius(), 32);
                self.texture.fill_polygon_channel(&vision, Channel::Blue, value);
            }
        }
        trace!(
            "occlusion mask redrawn: {} tokens, {} bands",
            tokens.len(),
            self.bands.values().len()
        );
    }

    /// Recomputes occlusion for every candidate object and applies changes
    /// through the debounced toggle.
    fn update_occlusion_states(&mut self, scene: &mut SceneState, tokens: &[Token], now: Instant) {
        let entries: Vec<(String, _)> = tokens
            .iter()
            .map(|t| (t.id.clone(), t.footprint))
            .collect();
        self.index.rebuild(&entries);

        for object in &scene.objects {
            if !object.depth_contributing && !self.occluded_ids.contains(&object.id) {
                continue;
            }

            let mut occluded = false;
            self.index.query_rect(object.bounds, &mut |token_id, _| {
                if occluded {
                    return;
                }
                if let Some(token) = tokens.iter().find(|t| t.id == token_id)
                    && Self::token_occludes(object, token)
                {
                    occluded = true;
                }
            });

            if occluded != object.occluded {
                // Re-scheduling an unchanged pending value every frame would
                // restart the delay forever; only a new value resets it.
                if self.debounce.pending(&object.id) != Some(&occluded) {
                    self.debounce.schedule(object.id.clone(), occluded, now);
                }
            } else {
                // State settled back before the delay elapsed; drop the
                // pending flip.
                self.debounce.cancel(&object.id);
            }
        }

        let occluded_ids = &mut self.occluded_ids;
        self.debounce.run_due(now, |id, value| {
            if let Some(object) = scene.object_mut(id) {
                object.occluded = value;
                if value {
                    occluded_ids.insert(id.clone());
                } else {
                    occluded_ids.remove(id);
                }
            }
            // An object removed while its toggle was pending is already
            // absent; nothing to apply.
        });
    }

    /// Whether `token` occludes `object`.
    ///
    /// The token must stand beneath the object. Objects restricting both
    /// light and weather (enclosed roofs) use corner sampling — any corner
    /// or the center of the token footprint beneath the object counts.
    /// Everything else requires full containment of the footprint.
    fn token_occludes(object: &SceneObject, token: &Token) -> bool {
        if token.elevation >= object.elevation {
            return false;
        }
        let region = Polygon::from_rect(object.bounds);
        if object.restricts_light && object.restricts_weather {
            let corners = token.footprint.corners();
            corners.iter().any(|&c| region.contains(c)) || region.contains(token.center)
        } else {
            region.contains_rect(token.footprint)
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.texture.resize(width, height);
    }
}
