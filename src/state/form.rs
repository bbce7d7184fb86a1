// Text input forms for modals.
// Labeled single-line fields with one focused at a time.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
}

/// A small form edited in place by key presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub title: &'static str,
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl Form {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            fields: Vec::new(),
            focus: 0,
        }
    }

    /// Add a field with an initial value.
    pub fn field(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            label,
            value: value.into(),
        });
        self
    }

    pub fn input(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    /// Move focus to the next field, wrapping around.
    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    /// Value of the field labeled `label`, trimmed.
    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map_or("", |f| f.value.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut form = Form::new("Edit").field("Tags", "cat").field("Description", "");

        form.input(',');
        form.input('d');
        form.focus_next();
        form.input('h');
        form.input('i');
        form.backspace();

        assert_eq!(form.value("Tags"), "cat,d");
        assert_eq!(form.value("Description"), "h");
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = Form::new("Upload").field("Path", "").field("Tags", "");
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn test_value_is_trimmed_and_missing_is_empty() {
        let form = Form::new("Upload").field("Path", "  ./cat.png ");
        assert_eq!(form.value("Path"), "./cat.png");
        assert_eq!(form.value("Nope"), "");
    }
}
