pub mod adapter;
pub mod screen;

use crate::types::Action;
use color_eyre::Result;
use std::io::Write;

pub trait Component {
    #[allow(unused_variables)]
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        Ok(None)
    }
    fn draw(&mut self, out: &mut dyn Write) -> Result<()>;
}
