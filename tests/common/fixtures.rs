//! Test fixtures - reusable component sources.

/// A component with two props
pub const MY_BUTTON: &str = r#"import { Component, Prop } from '@kiln/core';

@Component({ tag: 'my-button' })
export class MyButton {
  @Prop() label: string;
  @Prop() disabled: boolean;
}
"#;

/// A component that renders `my-button`
pub const MY_CARD: &str = r#"import { Component, Prop, h } from '@kiln/core';

@Component({ tag: 'my-card' })
export class MyCard {
  @Prop() heading: string;

  render() {
    return h('my-button', { label: this.heading });
  }
}
"#;

/// A plain module without components
pub const UTIL: &str = "export function clamp(n: number) {\n  return Math.max(0, n);\n}\n";

/// Unbalanced parenthesis
pub const BROKEN: &str = "export function broken() {\n  return (1;\n}\n";

/// `MY_BUTTON` with one more prop, which changes the public types
pub fn my_button_with_size() -> String {
    MY_BUTTON.replace(
        "@Prop() disabled: boolean;",
        "@Prop() disabled: boolean;\n  @Prop() size: string;",
    )
}
