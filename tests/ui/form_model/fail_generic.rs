#[derive(Clone, calmform::form::FormModel)]
struct DraftForm<T> {
    body: T,
}

fn main() {}
