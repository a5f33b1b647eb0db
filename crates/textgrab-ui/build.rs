fn main() {
    slint_build::compile("ui/textgrab.slint").expect("failed to compile slint ui");
}
