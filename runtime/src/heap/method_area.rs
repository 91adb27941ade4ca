use crate::class_loader::ClassLoader;
use crate::classfile::parser::parse_class_file;
use crate::classfile::ClassFile;
use crate::descriptor::parse_params;
use crate::error::JvmError;
use crate::keys::{ClassId, FieldKey, MethodId, MethodKey, Symbol};
use crate::rt::constant_pool::RuntimeConstantPool;
use crate::rt::field::{LayoutField, StaticField};
use crate::rt::method::Method;
use crate::rt::JavaClass;
use crate::vm::bootstrap_registry::BootstrapRegistry;
use crate::vm::Value;
use crate::{build_exception, debug_log, VmConfig};
use lasso::ThreadedRodeo;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The class registry: a process-wide map from class name to loaded class,
/// plus the arenas that own every class and method. On-demand loading runs
/// the reader, links the class against its (recursively loaded)
/// superclasses and interfaces, and preps static storage. `<clinit>` runs
/// later, driven by the interpreter before first active use.
pub struct MethodArea {
    class_loader: ClassLoader,
    class_name_to_index: HashMap<Symbol, ClassId>,
    classes: Vec<JavaClass>,
    methods: Vec<Method>,
    interner: Arc<ThreadedRodeo>,
    bootstrap_registry: Arc<BootstrapRegistry>,
}

impl MethodArea {
    pub fn init(
        config: &VmConfig,
        interner: Arc<ThreadedRodeo>,
    ) -> (Self, Arc<BootstrapRegistry>) {
        debug_log!("Creating method area...");
        let bootstrap_registry = Arc::new(BootstrapRegistry::new(&interner));
        let method_area = Self {
            class_loader: ClassLoader::new(&config.class_path),
            class_name_to_index: HashMap::new(),
            classes: Vec::with_capacity(64),
            methods: Vec::with_capacity(512),
            interner,
            bootstrap_registry: bootstrap_registry.clone(),
        };
        (method_area, bootstrap_registry)
    }

    pub fn interner(&self) -> &ThreadedRodeo {
        &self.interner
    }

    pub fn br(&self) -> &BootstrapRegistry {
        &self.bootstrap_registry
    }

    pub fn classes(&self) -> &[JavaClass] {
        &self.classes
    }

    pub fn is_loaded(&self, name: Symbol) -> bool {
        self.class_name_to_index.contains_key(&name)
    }

    pub fn get_class_id(&self, name: Symbol) -> Option<ClassId> {
        self.class_name_to_index.get(&name).copied()
    }

    pub fn get_class(&self, class_id: &ClassId) -> &JavaClass {
        &self.classes[class_id.to_index()]
    }

    pub fn get_method(&self, method_id: &MethodId) -> &Method {
        &self.methods[method_id.to_index()]
    }

    pub fn add(&mut self, name: Symbol, class: JavaClass) -> ClassId {
        self.classes.push(class);
        let class_id = ClassId::from_usize(self.classes.len());
        self.class_name_to_index.insert(name, class_id);
        class_id
    }

    fn push_method(&mut self, method: Method) -> MethodId {
        self.methods.push(method);
        MethodId::from_usize(self.methods.len())
    }

    /// Registry miss path: read `name + ".class"`, parse, link against the
    /// recursively loaded super chain, prep static storage.
    pub fn get_class_id_or_load(&mut self, name: Symbol) -> Result<ClassId, JvmError> {
        if let Some(class_id) = self.class_name_to_index.get(&name) {
            return Ok(*class_id);
        }
        self.load_class(name)
    }

    fn load_class(&mut self, name: Symbol) -> Result<ClassId, JvmError> {
        let name_str = self.interner.resolve(&name).to_string();
        debug_log!("Loading class {}", name_str);

        let data = match self.class_loader.load(&name_str) {
            Ok(data) => data,
            Err(JvmError::ClassNotFoundOnClasspath(_)) => {
                return Err(build_exception!(ClassNotFoundException, "{}", name_str))
            }
            Err(e) => return Err(e),
        };
        let cf = parse_class_file(&data)?;

        let super_id = match cf.super_class_name() {
            Some(super_name) => {
                let super_sym = self.interner.get_or_intern(super_name);
                Some(self.get_class_id_or_load(super_sym)?)
            }
            None => None,
        };

        let mut interface_ids = Vec::with_capacity(cf.interfaces.len());
        for &iface_idx in &cf.interfaces {
            let iface_name = cf.class_name(iface_idx).ok_or_else(|| {
                JvmError::ClassFormat("interface index is not a Class constant".to_string())
            })?;
            let iface_sym = self.interner.get_or_intern(iface_name);
            interface_ids.push(self.get_class_id_or_load(iface_sym)?);
        }

        let class = self.link_class(cf, super_id, interface_ids)?;
        let class_id = self.add(name, class);
        self.get_class(&class_id).prep_class()?;
        Ok(class_id)
    }

    /// Builds the runtime class: instance layout (super's layout first, own
    /// fields appended, so ancestor fields keep their offsets in every
    /// subclass), static storage, and the method table.
    fn link_class(
        &mut self,
        cf: ClassFile,
        super_id: Option<ClassId>,
        interfaces: Vec<ClassId>,
    ) -> Result<JavaClass, JvmError> {
        let name_str = cf
            .this_class_name()
            .ok_or_else(|| JvmError::ClassFormat("this_class is not a Class constant".to_string()))?
            .to_string();
        let name = self.interner.get_or_intern(&name_str);
        let flags = cf.access_flags;
        let fields = cf.fields;
        let methods = cf.methods;
        let cp = RuntimeConstantPool::new(cf.constant_pool);

        let mut instance_layout = match super_id {
            Some(id) => self.get_class(&id).instance_layout().to_vec(),
            None => Vec::new(),
        };
        let mut static_fields = Vec::new();

        let this_id = ClassId::from_usize(self.classes.len() + 1);

        for field in &fields {
            let key = FieldKey {
                name: cp.get_utf8_sym(field.name_idx, &self.interner)?,
                desc: cp.get_utf8_sym(field.desc_idx, &self.interner)?,
            };
            if field.access_flags.is_static() {
                static_fields.push(StaticField {
                    key,
                    flags: field.access_flags,
                    constant_value: field.constant_value,
                    value: RwLock::new(default_for_descriptor(
                        self.interner.resolve(&key.desc),
                    )),
                });
            } else {
                instance_layout.push(LayoutField {
                    key,
                    flags: field.access_flags,
                    declaring_class: this_id,
                    default: default_for_descriptor(self.interner.resolve(&key.desc)),
                });
            }
        }

        let clinit_sym = self.bootstrap_registry.clinit_sym;
        let mut method_ids = Vec::with_capacity(methods.len());
        let mut method_index = HashMap::new();
        let mut clinit = None;

        for mi in methods {
            let mkey = MethodKey {
                name: cp.get_utf8_sym(mi.name_idx, &self.interner)?,
                desc: cp.get_utf8_sym(mi.desc_idx, &self.interner)?,
            };
            let params = parse_params(self.interner.resolve(&mkey.desc))?;
            let method = Method::new(
                this_id,
                mkey.name,
                mkey.desc,
                mi.access_flags,
                params,
                mi.code,
            );
            let method_id = self.push_method(method);
            method_ids.push(method_id);
            if mkey.name == clinit_sym {
                clinit = Some(method_id);
            } else {
                method_index.insert(mkey, method_id);
            }
        }

        Ok(JavaClass::new(
            name,
            flags,
            super_id,
            interfaces,
            cp,
            method_ids,
            method_index,
            clinit,
            instance_layout,
            static_fields,
        ))
    }

    // Resolution walks (JVMS 5.4.3.2 / 5.4.3.3, minus access control).

    /// Methods: target class, then superclasses, then superinterfaces.
    pub fn find_method(&self, class_id: ClassId, key: &MethodKey) -> Option<MethodId> {
        let mut cur = Some(class_id);
        while let Some(id) = cur {
            let class = self.get_class(&id);
            if let Some(method_id) = class.find_declared_method(key) {
                return Some(method_id);
            }
            cur = class.super_id;
        }
        self.find_method_in_interfaces(class_id, key)
    }

    fn find_method_in_interfaces(&self, class_id: ClassId, key: &MethodKey) -> Option<MethodId> {
        let mut cur = Some(class_id);
        while let Some(id) = cur {
            let class = self.get_class(&id);
            for &iface in &class.interfaces {
                if let Some(method_id) = self.get_class(&iface).find_declared_method(key) {
                    return Some(method_id);
                }
                if let Some(method_id) = self.find_method_in_interfaces(iface, key) {
                    return Some(method_id);
                }
            }
            cur = class.super_id;
        }
        None
    }

    /// Static fields: target class statics, then superclasses, then
    /// superinterfaces. Returns the declaring class and its storage slot.
    pub fn find_static_field(
        &self,
        class_id: ClassId,
        key: &FieldKey,
    ) -> Option<(ClassId, usize)> {
        let mut cur = Some(class_id);
        while let Some(id) = cur {
            let class = self.get_class(&id);
            if let Some(slot) = class.find_static_slot(key) {
                return Some((id, slot));
            }
            for &iface in &class.interfaces {
                if let Some(found) = self.find_static_field(iface, key) {
                    return Some(found);
                }
            }
            cur = class.super_id;
        }
        None
    }

    /// Override lookup for invokevirtual: walk the receiver's actual class
    /// chain only (no interfaces).
    pub fn find_virtual_method(&self, class_id: ClassId, key: &MethodKey) -> Option<MethodId> {
        let mut cur = Some(class_id);
        while let Some(id) = cur {
            let class = self.get_class(&id);
            if let Some(method_id) = class.find_declared_method(key) {
                return Some(method_id);
            }
            cur = class.super_id;
        }
        None
    }

    /// Name-based subtype test over the super chain and interfaces.
    pub fn instance_of(&self, class_id: ClassId, target: Symbol) -> bool {
        let mut cur = Some(class_id);
        while let Some(id) = cur {
            let class = self.get_class(&id);
            if class.name == target {
                return true;
            }
            for &iface in &class.interfaces {
                if self.instance_of(iface, target) {
                    return true;
                }
            }
            cur = class.super_id;
        }
        false
    }
}

fn default_for_descriptor(desc: &str) -> Value {
    match desc.as_bytes().first() {
        Some(b'J') => Value::Long(0),
        Some(b'F') => Value::Float(0.0),
        Some(b'D') => Value::Double(0.0),
        Some(b'L') | Some(b'[') => Value::Null,
        _ => Value::Integer(0),
    }
}
