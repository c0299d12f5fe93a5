//! Shared application-wide constants.
//! Centralizes tweakable values used across the physics engine, interactions
//! and rendering.

// Node defaults
/// Color palette offered in the context menu; the first entry is the default
/// node color.
pub const PALETTE: [&str; 8] = [
    "#0d9488", // Teal
    "#059669", // Emerald
    "#65a30d", // Lime
    "#0891b2", // Cyan
    "#d97706", // Amber
    "#db2777", // Pink
    "#475569", // Slate
    "#57534e", // Stone
];

/// Default radius for circle-shaped nodes (world units).
pub const DEFAULT_CIRCLE_RADIUS: f32 = 50.0;
/// Default width for rectangle-shaped nodes (world units).
pub const DEFAULT_RECT_WIDTH: f32 = 180.0;
/// Default height for rectangle-shaped nodes (world units).
pub const DEFAULT_RECT_HEIGHT: f32 = 120.0;

/// Minimum circle radius after resizing. Prevents degenerate geometry.
pub const MIN_CIRCLE_RADIUS: f32 = 30.0;
/// Minimum rectangle width after resizing.
pub const MIN_RECT_WIDTH: f32 = 100.0;
/// Minimum rectangle height after resizing.
pub const MIN_RECT_HEIGHT: f32 = 60.0;

/// Label given to freshly created nodes before the user types anything.
pub const DEFAULT_NODE_LABEL: &str = "Idea";
/// Label given to the magnet node.
pub const MAGNET_NODE_LABEL: &str = "MAGNET";
/// Labels treated as untouched placeholders. A merged-away node whose text is
/// one of these contributes no text to the survivor.
pub const PLACEHOLDER_LABELS: [&str; 2] = ["Idea", "想法"];
/// Color used for the magnet node.
pub const MAGNET_COLOR: &str = "#d97706";

// Canvas interactions
/// Movement threshold in screen pixels distinguishing a click from a drag.
pub const DRAG_THRESHOLD: f32 = 4.0;
/// Edge hit threshold in screen pixels (divided by zoom for world-space tests).
pub const EDGE_HIT_THRESHOLD: f32 = 20.0;
/// Screen-pixel radius around a node's resize handle that starts a resize.
pub const RESIZE_HANDLE_RADIUS: f32 = 30.0;
/// Screen-pixel distance from the bottom-right viewport corner inside which a
/// dropped node is deleted.
pub const TRASH_ZONE_RADIUS: f32 = 350.0;

// Zoom
/// Wheel-delta to zoom-factor conversion.
pub const ZOOM_SENSITIVITY: f32 = 0.001;
/// Minimum zoom factor.
pub const MIN_ZOOM: f32 = 0.1;
/// Maximum zoom factor.
pub const MAX_ZOOM: f32 = 3.0;

// Physics: slider-to-unit ranges. Sliders are normalized 0-100 and mapped
// linearly into these physical ranges.
/// Pairwise repulsion strength range.
pub const REPULSION_RANGE: (f32, f32) = (200.0, 4000.0);
/// Spring rest-length range (world units).
pub const REST_LENGTH_RANGE: (f32, f32) = (50.0, 400.0);
/// Hookean spring stiffness range.
pub const STIFFNESS_RANGE: (f32, f32) = (0.005, 0.1);
/// Center-gravity strength range.
pub const GRAVITY_RANGE: (f32, f32) = (0.0, 0.05);
/// Velocity damping factor range; the friction slider is inverted into this.
pub const DAMPING_RANGE: (f32, f32) = (0.8, 0.98);

/// Scale applied when accumulating repulsion and spring forces into velocity.
pub const FORCE_SCALE: f32 = 0.1;
/// Scale applied when accumulating center gravity into velocity.
pub const GRAVITY_SCALE: f32 = 0.05;
/// Peak-to-peak amplitude of the idle "breathing" jitter per axis per tick.
pub const JITTER_AMPLITUDE: f32 = 0.15;
/// Floor for squared pairwise distances; guards the repulsion division.
pub const DIST_SQ_FLOOR: f32 = 1.0;

// Edge tightening / merge
/// Seconds a tighten gesture takes to reach full charge.
pub const TIGHTEN_CHARGE_SECS: f64 = 1.0;
/// Spring stiffness of a tightening edge at zero charge.
pub const TIGHTEN_BASE_STIFFNESS: f32 = 0.08;
/// Additional stiffness of a tightening edge at full charge.
pub const TIGHTEN_EXTRA_STIFFNESS: f32 = 0.3;
/// Charge progress that must be exceeded before a merge can trigger.
pub const MERGE_CHARGE_THRESHOLD: f32 = 0.75;
/// Fraction of the endpoints' combined physics radii under which they are
/// considered close enough to merge.
pub const MERGE_PROXIMITY_FACTOR: f32 = 0.9;
/// Per-axis growth applied to the surviving node of a merge.
pub const MERGE_GROWTH_FACTOR: f32 = 1.1;

// Throw-on-release
/// Multiplier converting recent pointer velocity into node velocity.
pub const THROW_SCALE: f32 = 15.0;
/// Speed cap for thrown nodes (world units per tick).
pub const MAX_THROW_SPEED: f32 = 30.0;

// Undo/redo
/// Maximum number of undo snapshots to retain.
pub const MAX_UNDO_HISTORY: usize = 30;
