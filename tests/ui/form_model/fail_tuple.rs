#[derive(calmform::form::FormModel)]
struct SearchForm(String);

fn main() {}
