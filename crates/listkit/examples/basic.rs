//! Basic Listkit usage example
//!
//! Run with: cargo run --example basic

use listkit::Listkit;

fn main() -> anyhow::Result<()> {
    let listkit = Listkit::new();

    // Variables and messages
    let result = listkit.run_str(
        r#"
        cmake_minimum_required(VERSION 3.28)
        set(name World)
        message(STATUS "Hello, ${name}!")
        "#,
    );
    print!("{}", result.output);

    // Lists and loops
    let result = listkit.run_str(
        r#"
        cmake_minimum_required(VERSION 3.28)
        set(fruits apple banana cherry)
        list(LENGTH fruits count)
        foreach(fruit IN LISTS fruits)
          message("I like ${fruit}")
        endforeach()
        message("${count} fruits")
        "#,
    );
    print!("{}", result.output);

    // Functions return values through PARENT_SCOPE
    let result = listkit.run_str(
        r#"
        cmake_minimum_required(VERSION 3.28)
        function(twice out value)
          set(${out} "${value}${value}" PARENT_SCOPE)
        endfunction()
        twice(word ab)
        message("twice: ${word}")
        "#,
    );
    print!("{}", result.output);

    // Errors carry the failing invocation's location
    let result = listkit.run_str("cmake_minimum_required(VERSION 3.28)\nfrobnicate(x)\n");
    if let Some(error) = &result.error {
        println!("Error: {}", error);
    }

    Ok(())
}
