use crate::keys::{MethodKey, Symbol};
use lasso::ThreadedRodeo;

/// Pre-interned names and keys the runtime reaches for constantly.
pub struct BootstrapRegistry {
    // Method names
    pub init_sym: Symbol,
    pub clinit_sym: Symbol,
    pub main_sym: Symbol,

    // Descriptors
    pub void_desc: Symbol,       // ()V
    pub main_desc: Symbol,       // ([Ljava/lang/String;)V
    pub string_desc: Symbol,     // Ljava/lang/String;
    pub char_array_desc: Symbol, // [C

    // Class names
    pub java_lang_object_sym: Symbol,
    pub java_lang_string_sym: Symbol,

    // Method keys
    pub main_mk: MethodKey,
    pub no_arg_constructor_mk: MethodKey,
    pub clinit_mk: MethodKey,
}

impl BootstrapRegistry {
    pub fn new(interner: &ThreadedRodeo) -> Self {
        let init_sym = interner.get_or_intern("<init>");
        let clinit_sym = interner.get_or_intern("<clinit>");
        let main_sym = interner.get_or_intern("main");

        let void_desc = interner.get_or_intern("()V");
        let main_desc = interner.get_or_intern("([Ljava/lang/String;)V");
        let string_desc = interner.get_or_intern("Ljava/lang/String;");
        let char_array_desc = interner.get_or_intern("[C");

        let java_lang_object_sym = interner.get_or_intern("java/lang/Object");
        let java_lang_string_sym = interner.get_or_intern("java/lang/String");

        BootstrapRegistry {
            init_sym,
            clinit_sym,
            main_sym,
            void_desc,
            main_desc,
            string_desc,
            char_array_desc,
            java_lang_object_sym,
            java_lang_string_sym,
            main_mk: MethodKey {
                name: main_sym,
                desc: main_desc,
            },
            no_arg_constructor_mk: MethodKey {
                name: init_sym,
                desc: void_desc,
            },
            clinit_mk: MethodKey {
                name: clinit_sym,
                desc: void_desc,
            },
        }
    }
}
