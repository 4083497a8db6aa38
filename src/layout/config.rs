//! Layout geometry parameters.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Dimensions are quantized to integers (×1e6) before hashing so the
//! `params_hash` is stable across platforms and serializers.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};

/// Quantization factor for parameter hashing.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Layout parameters version.
pub const LAYOUT_VERSION: &str = "layout_v1";

/// Geometry of the tree canvas.
///
/// ## Parameters
///
/// - `node_width` / `node_height`: Size of a person card
/// - `partner_gap`: Horizontal gap between partners in a chain
/// - `sibling_gap`: Horizontal gap between unrelated units in a band
/// - `generation_gap`: Vertical gap between bands
/// - `margin`: Canvas margin after normalization
/// - `junction_drop`: Distance from the parent row's bottom edge to a junction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Parameters version identifier.
    pub version: String,
    /// Card width.
    pub node_width: f64,
    /// Card height.
    pub node_height: f64,
    /// Gap between partners.
    pub partner_gap: f64,
    /// Gap between sibling blocks and unrelated units.
    pub sibling_gap: f64,
    /// Gap between generation bands.
    pub generation_gap: f64,
    /// Canvas margin.
    pub margin: f64,
    /// Junction offset below the parent row.
    pub junction_drop: f64,
}

impl LayoutConfig {
    /// Vertical distance between the tops of two adjacent bands.
    pub fn band_height(&self) -> f64 {
        self.node_height + self.generation_gap
    }

    /// Compute a hash of the layout parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedLayoutParams {
        let q = |v: f64| quantize(v, FLOAT_QUANTIZATION_FACTOR);
        QuantizedLayoutParams {
            version: self.version.clone(),
            node_width: q(self.node_width),
            node_height: q(self.node_height),
            partner_gap: q(self.partner_gap),
            sibling_gap: q(self.sibling_gap),
            generation_gap: q(self.generation_gap),
            margin: q(self.margin),
            junction_drop: q(self.junction_drop),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            version: LAYOUT_VERSION.to_string(),
            node_width: 150.0,
            node_height: 80.0,
            partner_gap: 20.0,
            sibling_gap: 40.0,
            generation_gap: 100.0,
            margin: 40.0,
            junction_drop: 30.0,
        }
    }
}

#[derive(Serialize)]
struct QuantizedLayoutParams {
    version: String,
    node_width: i64,
    node_height: i64,
    partner_gap: i64,
    sibling_gap: i64,
    generation_gap: i64,
    margin: i64,
    junction_drop: i64,
}
