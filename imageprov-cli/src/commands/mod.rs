pub mod defaults;
pub mod run;
