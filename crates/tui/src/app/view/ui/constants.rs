pub(super) const MAX_INPUT_HEIGHT: u16 = 6;
pub(super) const INPUT_PADDING_X: u16 = 2;
pub(super) const INPUT_PADDING_Y: u16 = 1;
pub(super) const PANEL_GAP: u16 = 1;
pub(super) const RUN_HEIGHT: u16 = 1;
pub(super) const STATUS_HEIGHT: u16 = 1;
pub(super) const ARGUMENT_PREVIEW_WIDTH: usize = 80;
pub(super) const OUTPUT_PREVIEW_LINES: usize = 3;
