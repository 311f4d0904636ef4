#[derive(calmform::form::FormModel)]
enum LoginForm {
    Email(String),
    Phone(String),
}

fn main() {}
