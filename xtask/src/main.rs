//! Developer tasks for the bryc workspace (currently a placeholder; no
//! code-generation or packaging steps are implemented by this crate).

fn main() {
    println!("xtask: nothing to do yet");
}
