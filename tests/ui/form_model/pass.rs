use calmform::form::{FieldLens, FormModel};

#[derive(Clone, calmform::form::FormModel)]
struct SignInForm {
    email: String,
    password: String,
}

fn main() {
    let fields = SignInForm::fields();
    let lens = fields.email();
    let mut model = SignInForm {
        email: "reader@books.example".to_string(),
        password: String::new(),
    };
    lens.set(&mut model, "writer@books.example".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "writer@books.example");
    assert_eq!(fields.password().get(&model), "");
}
