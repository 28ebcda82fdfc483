//! Fuzz target: calibration blob decoder and register packing
//!
//! Feeds arbitrary OTP contents through `calibrate` against a simulated
//! register file and verifies:
//! - No panics under arbitrary byte inputs
//! - A rejected blob leaves every register untouched
//! - Every written correction fits the 12-bit field and lands in its
//!   sensor's half of the CDATA word
//!
//! cargo fuzz run fuzz_calibration_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use sun50i_ths::adapters::sim::{SimCell, SimRegisters};
use sun50i_ths::calibration::calibrate;
use sun50i_ths::config::SUN50I_H6;
use sun50i_ths::regs::{ThsRegisters, cdata};

// Linked for the embassy-sync signal in the library.
use critical_section as _;

fuzz_target!(|data: &[u8]| {
    let regs = ThsRegisters::new(SimRegisters::new());
    let cell = SimCell::new(data);

    match calibrate(&regs, &SUN50I_H6, &cell) {
        Ok(report) => {
            assert_eq!(report.written.len() + report.skipped.len(), SUN50I_H6.sensor_count);
            let word = regs.bus().peek(cdata(0));
            for cal in &report.written {
                assert!(cal.value <= 0xfff);
                let half = if cal.sensor % 2 == 1 { word >> 16 } else { word & 0xffff };
                assert_eq!(half, u32::from(cal.value));
            }
        }
        Err(_) => {
            assert!(regs.bus().writes().is_empty());
            assert_eq!(regs.bus().peek(cdata(0)), 0x0800_0800);
        }
    }
});
