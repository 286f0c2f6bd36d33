mod advance;
mod click;
mod control;
mod expect;
mod load;
mod show;
mod timing;
mod type_text;
mod wait;

pub use advance::Advance;
pub use click::Click;
pub use control::DeclareControl;
pub use expect::Expect;
pub use load::Load;
pub use show::Show;
pub use timing::{SetDebounce, SetPunctuationPause, SetTypingSpeed};
pub use type_text::TypeText;
pub use wait::Wait;
