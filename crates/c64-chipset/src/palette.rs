//! Fixed 16-entry color palette, indexed by the video chip's 4-bit
//! color output.

/// RGB values as `0x00RRGGBB`.
pub const PALETTE: [u32; 16] = [
    0x0000_0000, // black
    0x00FF_FFFF, // white
    0x0088_0000, // red
    0x00AA_FFEE, // cyan
    0x00CC_44CC, // purple
    0x0000_CC55, // green
    0x0000_00AA, // blue
    0x00EE_EE77, // yellow
    0x00DD_8855, // orange
    0x0066_4400, // brown
    0x00FF_7777, // light red
    0x0033_3333, // dark grey
    0x0077_7777, // grey
    0x00AA_FF66, // light green
    0x0000_88FF, // light blue
    0x00BB_BBBB, // light grey
];
