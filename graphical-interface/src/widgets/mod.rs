mod callout;
pub use callout::{CalloutAction, WidgetCallout};
