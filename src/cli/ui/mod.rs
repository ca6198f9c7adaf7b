pub mod abort_watch;
pub mod formatting;
pub mod prompts;
pub mod review_view;
pub mod step_view;
pub mod table_renderer;
pub mod test_mode;
