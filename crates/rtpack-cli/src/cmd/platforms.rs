//! Platforms command

use rtpack_core::Config;

use crate::ui::table;

pub fn platforms(config: &Config) {
    println!("{}", table::platforms(&config.build.targets));
}
